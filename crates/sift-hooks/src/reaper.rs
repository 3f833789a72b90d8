//! Kills a conversation's PTY sessions when the conversation is deleted

use crate::base::Hook;
use sift_pty::PtyManager;
use std::sync::Arc;
use tracing::debug;

pub struct PtyReaperHook {
    manager: Arc<PtyManager>,
}

impl PtyReaperHook {
    pub fn new(manager: Arc<PtyManager>) -> Self {
        Self { manager }
    }
}

impl Hook for PtyReaperHook {
    fn name(&self) -> &str {
        "pty-reaper"
    }

    fn on_session_deleted(&mut self, session_id: &str) {
        let count = self.manager.cleanup_by_session(session_id);
        debug!(session = session_id, count, "PTY sessions reaped");
    }
}
