//! Group request store — the authoritative set of active BigLFG requests.
//! In-memory only; shared by the creation path and the reconciliation loop.
//!
//! Every access goes through one short critical section. Callers only ever
//! see clones, so nothing outside the store can hold a live entry.

use std::sync::{Mutex, MutexGuard};

use lfgrelay_core::error::{LfgError, Result};
use lfgrelay_core::types::MessageId;

use crate::request::GroupRequest;

/// Active requests in insertion order.
#[derive(Default)]
pub struct GroupRequestStore {
    requests: Mutex<Vec<GroupRequest>>,
}

impl GroupRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<GroupRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a request. Fails if its id is already tracked.
    pub fn insert(&self, request: GroupRequest) -> Result<()> {
        let mut requests = self.lock();
        if requests.iter().any(|r| r.id == request.id) {
            return Err(LfgError::DuplicateId(request.id));
        }
        requests.push(request);
        Ok(())
    }

    /// Independent point-in-time copy, in insertion order.
    pub fn snapshot(&self) -> Vec<GroupRequest> {
        self.lock().clone()
    }

    /// Remove and return a request. Absent ids are a no-op.
    pub fn remove(&self, id: MessageId) -> Option<GroupRequest> {
        let mut requests = self.lock();
        let pos = requests.iter().position(|r| r.id == id)?;
        Some(requests.remove(pos))
    }

    /// Apply `mutator` to the live entry. Returns false if the entry is gone.
    pub fn update<F>(&self, id: MessageId, mutator: F) -> bool
    where
        F: FnOnce(&mut GroupRequest),
    {
        match self.lock().iter_mut().find(|r| r.id == id) {
            Some(request) => {
                mutator(request);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: MessageId) -> Option<GroupRequest> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.lock().iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::DistributedMessage;
    use chrono::{TimeDelta, Utc};
    use lfgrelay_core::types::ChannelId;

    fn request(id: u64) -> GroupRequest {
        GroupRequest::new(
            "raid",
            vec![DistributedMessage {
                channel: ChannelId(1),
                message: MessageId(id),
            }],
            4,
            TimeDelta::minutes(15),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let store = GroupRequestStore::new();
        store.insert(request(1)).unwrap();
        let err = store.insert(request(1)).unwrap_err();
        assert!(matches!(err, LfgError::DuplicateId(MessageId(1))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = GroupRequestStore::new();
        store.insert(request(1)).unwrap();
        store.insert(request(2)).unwrap();

        assert!(store.remove(MessageId(1)).is_some());
        assert!(store.remove(MessageId(1)).is_none());
        assert!(store.remove(MessageId(99)).is_none());
        assert_eq!(store.len(), 1);
        assert!(store.contains(MessageId(2)));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let store = GroupRequestStore::new();
        store.insert(request(1)).unwrap();
        store.insert(request(2)).unwrap();

        let snapshot = store.snapshot();
        store.remove(MessageId(1));
        store.insert(request(3)).unwrap();
        store.update(MessageId(2), |r| r.current_count = 9);

        let ids: Vec<_> = snapshot.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![MessageId(1), MessageId(2)]);
        assert_eq!(snapshot[1].current_count, 0);
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let store = GroupRequestStore::new();
        for id in [5, 3, 9] {
            store.insert(request(id)).unwrap();
        }
        let ids: Vec<_> = store.snapshot().iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![5, 3, 9]);
    }

    #[test]
    fn test_update_missing_is_noop() {
        let store = GroupRequestStore::new();
        store.insert(request(1)).unwrap();
        assert!(store.update(MessageId(1), |r| r.current_count = 3));
        assert_eq!(store.get(MessageId(1)).unwrap().current_count, 3);

        store.remove(MessageId(1));
        assert!(!store.update(MessageId(1), |r| r.current_count = 7));
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_insert_and_remove() {
        let store = std::sync::Arc::new(GroupRequestStore::new());
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let id = t * 1000 + i;
                        store.insert(request(id)).unwrap();
                        if i % 2 == 0 {
                            store.remove(MessageId(id));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8 * 25);
    }
}
