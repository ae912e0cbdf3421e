use std::sync::Arc;

use dashmap::DashMap;
use reelscan_model::LibraryId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per library.
///
/// Every read-history-then-transition sequence on a library's scans runs
/// under its guard, so two callers can never both observe "no active scan"
/// and both go on to start one.
#[derive(Debug, Clone, Default)]
pub struct LibraryLocks {
    locks: Arc<DashMap<LibraryId, Arc<Mutex<()>>>>,
}

impl LibraryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, library_id: LibraryId) -> OwnedMutexGuard<()> {
        // Clone the Arc out before awaiting so no map shard stays locked.
        let mutex = self
            .locks
            .entry(library_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}
