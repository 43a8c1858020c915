//! Per-node async locks
//!
//! Serializes work that must not interleave for the same node but may run in
//! parallel for different nodes, such as reconciling one directory. Guards are
//! async-aware so they can be held across remote calls.

use crate::types::NodeId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per node id.
pub struct KeyedLocks {
    locks: RwLock<HashMap<NodeId, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    fn lock_for(&self, id: NodeId) -> Arc<Mutex<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(&id) {
                return Arc::clone(lock);
            }
        }

        // Another task may have created it between the two lock acquisitions.
        let mut map = self.locks.write();
        Arc::clone(map.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    /// Wait for exclusive access to `id`.
    pub async fn lock(&self, id: NodeId) -> OwnedMutexGuard<()> {
        self.lock_for(id).lock_owned().await
    }

    /// Drop the lock entry of a node that left the namespace.
    pub fn forget(&self, id: NodeId) {
        self.locks.write().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self::new()
    }
}
