use std::collections::HashMap;
use std::sync::Arc;

use rocket::tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::mongodb::Id;

/// Per-voter mutual exclusion for vote-affecting operations.
///
/// Every cast/submit/clear is a check-then-act sequence against the voter's
/// ballot state, so all of them take this lock for the duration of the
/// operation. Locks are keyed by voter ID: operations on different voters
/// never contend. Entries are never removed; the map is bounded by the number
/// of voters who have ever touched their ballot.
pub struct VoterLocks {
    locks: Mutex<HashMap<Id, Arc<Mutex<()>>>>,
}

impl VoterLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the lock for the given voter, waiting if another operation on
    /// the same voter is in flight.
    pub async fn acquire(&self, voter_id: Id) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(voter_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

impl Default for VoterLocks {
    fn default() -> Self {
        Self::new()
    }
}
