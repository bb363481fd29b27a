//! Per-room mapping from client id to session.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::session::ClientSession;
use crate::Error;

/// Mutex-guarded `id -> session` table. Callers that need a stable snapshot should use
/// [`ClientRegistry::snapshot`] rather than holding the lock across an iteration that may itself
/// try to lock the registry (e.g. to remove a slow recipient).
#[derive(Default)]
pub struct ClientRegistry {
    sessions: Mutex<AHashMap<u16, Arc<ClientSession>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u16) -> Option<Arc<ClientSession>> {
        self.sessions.lock().get(&id).cloned()
    }

    /// Adds `session`, failing with `Error::Duplicate` if `id` is already registered.
    pub fn add(&self, id: u16, session: Arc<ClientSession>) -> Result<(), Error> {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&id) {
            return Err(Error::Duplicate);
        }
        sessions.insert(id, session);
        Ok(())
    }

    /// Removes `id`, returning its session if it was present. Idempotent.
    pub fn remove(&self, id: u16) -> Option<Arc<ClientSession>> {
        self.sessions.lock().remove(&id)
    }

    pub fn exists(&self, id: u16) -> bool {
        self.sessions.lock().contains_key(&id)
    }

    /// A point-in-time copy of every registered session.
    pub fn snapshot(&self) -> Vec<Arc<ClientSession>> {
        self.sessions.lock().values().cloned().collect()
    }

    /// An arbitrary member, or `None` if the registry is empty. Used for host re-election; callers
    /// that need a deterministic choice must not rely on this ordering.
    pub fn first(&self) -> Option<Arc<ClientSession>> {
        self.sessions.lock().values().next().cloned()
    }

    pub fn count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn clear(&self) {
        self.sessions.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::dummy_session;

    #[test]
    fn add_rejects_duplicates() {
        let registry = ClientRegistry::new();
        registry.add(0, dummy_session(0)).unwrap();
        assert!(matches!(
            registry.add(0, dummy_session(0)),
            Err(Error::Duplicate)
        ));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = ClientRegistry::new();
        registry.add(3, dummy_session(3)).unwrap();
        assert!(registry.remove(3).is_some());
        assert!(registry.remove(3).is_none());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn snapshot_reflects_current_membership() {
        let registry = ClientRegistry::new();
        registry.add(1, dummy_session(1)).unwrap();
        registry.add(2, dummy_session(2)).unwrap();
        let mut ids: Vec<u16> = registry.snapshot().iter().map(|s| s.id()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }
}
