//! Hook registry dispatching host events in registration order

use crate::base::Hook;
use sift_core::Message;

pub struct HookRegistry {
    hooks: Vec<Box<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Register a hook; disabled hooks are dropped
    pub fn register(&mut self, hook: Box<dyn Hook>) {
        if hook.is_enabled() {
            self.hooks.push(hook);
        }
    }

    /// Each hook sees the previous hook's output
    pub fn on_messages(&mut self, session_id: &str, mut messages: Vec<Message>) -> Vec<Message> {
        for hook in &mut self.hooks {
            messages = hook.on_messages(session_id, messages);
        }
        messages
    }

    pub fn on_system(&mut self, session_id: &str) -> Vec<String> {
        self.hooks
            .iter_mut()
            .filter_map(|h| h.on_system(session_id))
            .filter(|fragment| !fragment.is_empty())
            .collect()
    }

    pub fn on_session_deleted(&mut self, session_id: &str) {
        for hook in &mut self.hooks {
            hook.on_session_deleted(session_id);
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
