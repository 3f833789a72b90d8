//! Base hook trait

use sift_core::Message;

/// A participant in the host's lifecycle events. Every method defaults to a
/// no-op so hooks implement only the events they care about.
pub trait Hook: Send + Sync {
    /// Hook name (unique identifier)
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Disabled hooks are not registered
    fn is_enabled(&self) -> bool {
        true
    }

    /// Called before the event log is sent to the model
    fn on_messages(&mut self, _session_id: &str, messages: Vec<Message>) -> Vec<Message> {
        messages
    }

    /// Called while the system prompt is assembled; returns a fragment to append
    fn on_system(&mut self, _session_id: &str) -> Option<String> {
        None
    }

    /// Called when the host deletes a conversation
    fn on_session_deleted(&mut self, _session_id: &str) {}
}
