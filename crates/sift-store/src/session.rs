//! Per-conversation state registry

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory state keyed by conversation id. An entry is created on first
/// access and lives until [`SessionRegistry::remove`].
#[derive(Debug)]
pub struct SessionRegistry<S> {
    sessions: Mutex<HashMap<String, S>>,
}

impl<S: Default> SessionRegistry<S> {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, S>> {
        // A panic while holding the lock leaves plain data behind; keep serving it
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` against the conversation's state, creating it if absent
    pub fn get_or_create<R>(&self, conversation_id: &str, f: impl FnOnce(&mut S) -> R) -> R {
        let mut sessions = self.lock();
        let state = sessions.entry(conversation_id.to_string()).or_default();
        f(state)
    }

    /// Run `f` against existing state only
    pub fn get<R>(&self, conversation_id: &str, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.lock().get(conversation_id).map(f)
    }

    pub fn remove(&self, conversation_id: &str) -> Option<S> {
        self.lock().remove(conversation_id)
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.lock().contains_key(conversation_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<S: Default> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_then_remove() {
        let registry: SessionRegistry<Vec<u32>> = SessionRegistry::new();
        assert!(registry.get("a", |v| v.len()).is_none());

        registry.get_or_create("a", |v| v.push(1));
        registry.get_or_create("a", |v| v.push(2));
        registry.get_or_create("b", |v| v.push(9));

        assert_eq!(registry.get("a", |v| v.clone()), Some(vec![1, 2]));
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.remove("a"), Some(vec![1, 2]));
        assert!(!registry.contains("a"));
        assert!(registry.contains("b"));
    }
}
