//! Append-only store of outbound frames tagged by sender, replayed to late joiners.

use bytes::Bytes;
use parking_lot::Mutex;

use crate::session::ClientSession;
use crate::Error;

struct Entry {
    message: Bytes,
    sender_id: u16,
}

/// Mutex-guarded set of `(message, sender_id)` pairs.
///
/// `remove_by_sender` prunes exactly the entries tagged with that sender; `replay_to` delivers
/// every currently-stored entry to a session once, in storage order.
#[derive(Default)]
pub struct BufferedRpcStore {
    entries: Mutex<Vec<Entry>>,
}

impl BufferedRpcStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, message: Bytes, sender_id: u16) {
        self.entries.lock().push(Entry { message, sender_id });
    }

    /// Removes every entry tagged with `sender_id`. A no-op if none exist.
    pub fn remove_by_sender(&self, sender_id: u16) {
        self.entries.lock().retain(|e| e.sender_id != sender_id);
    }

    /// Delivers every currently-stored entry to `session`, once each, in storage order.
    pub async fn replay_to(&self, session: &ClientSession) -> Result<(), Error> {
        let snapshot: Vec<Bytes> = self
            .entries
            .lock()
            .iter()
            .map(|e| e.message.clone())
            .collect();

        for message in snapshot {
            session.send(message).await?;
        }

        Ok(())
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_by_sender_prunes_only_its_own_entries() {
        let store = BufferedRpcStore::new();
        store.add(Bytes::from_static(b"a"), 1);
        store.add(Bytes::from_static(b"b"), 2);
        store.add(Bytes::from_static(b"c"), 1);

        store.remove_by_sender(1);

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_empties_the_store() {
        let store = BufferedRpcStore::new();
        store.add(Bytes::from_static(b"a"), 1);
        store.clear();
        assert!(store.is_empty());
    }
}
