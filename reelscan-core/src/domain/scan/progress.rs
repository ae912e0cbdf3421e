//! Live progress for in-flight scans.
//!
//! Writers are the scan jobs, readers are status pollers. Entries live in a
//! sharded concurrent map so each key is updated atomically without a
//! process-wide lock; unrelated scans never contend on the same entry.
//!
//! Merge strategy: additive. Jobs report deltas (`completed`, `total`) and
//! the tracker sums them, so per-key counters only ever grow no matter how
//! job reports interleave.

use chrono::Utc;
use dashmap::DashMap;
use reelscan_model::{
    FileChange, LibraryId, ScanId, ScanProgress, ScanProgressKey, ScanStatus,
    UserId,
};
use tracing::trace;

use crate::error::{Result, ScanError};

#[derive(Debug, Default)]
pub struct ScanProgressTracker {
    entries: DashMap<ScanProgressKey, ScanProgress>,
}

impl ScanProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a scan. Snapshots left behind by earlier scans of the
    /// same library are superseded and dropped.
    pub fn begin(
        &self,
        key: ScanProgressKey,
        library_id: LibraryId,
        status: ScanStatus,
    ) {
        self.entries.retain(|existing, progress| {
            *existing == key || progress.library_id != Some(library_id)
        });

        let mut progress = ScanProgress::new(key, status);
        progress.library_id = Some(library_id);
        self.entries.insert(key, progress);
    }

    /// Number of jobs that still have to walk their location.
    pub fn expect_walks(&self, key: ScanProgressKey, walks: u32) {
        if let Some(mut entry) = self.entries.get_mut(&key) {
            entry.pending_walks = walks;
            entry.updated_at = Utc::now();
        }
    }

    /// One job finished walking, successfully or not.
    pub fn walk_finished(&self, key: ScanProgressKey) {
        if let Some(mut entry) = self.entries.get_mut(&key) {
            entry.pending_walks = entry.pending_walks.saturating_sub(1);
            entry.updated_at = Utc::now();
        }
    }

    /// Add a job's delta to the scan's counters.
    ///
    /// Unknown keys are created on first write so a job that reports before
    /// `begin` is not lost.
    pub fn record_progress(
        &self,
        scan_id: ScanId,
        user_id: UserId,
        completed: u64,
        total: u64,
    ) {
        let key = ScanProgressKey::new(scan_id, user_id);
        let mut entry = self
            .entries
            .entry(key)
            .or_insert_with(|| ScanProgress::new(key, ScanStatus::Running));
        entry.completed = entry.completed.saturating_add(completed);
        entry.total = entry.total.saturating_add(total);
        entry.updated_at = Utc::now();
        trace!(
            %key,
            completed = entry.completed,
            total = entry.total,
            "scan progress"
        );
    }

    /// Count one classified file against the scan.
    pub fn record_change(&self, key: ScanProgressKey, change: FileChange) {
        if let Some(mut entry) = self.entries.get_mut(&key) {
            entry.changes.record(change);
            entry.updated_at = Utc::now();
        }
    }

    /// Add `amount` files of one classification, e.g. deleted paths found
    /// when the scan finishes.
    pub fn record_changes(
        &self,
        key: ScanProgressKey,
        change: FileChange,
        amount: u64,
    ) {
        if let Some(mut entry) = self.entries.get_mut(&key) {
            entry.changes.add(change, amount);
            entry.updated_at = Utc::now();
        }
    }

    /// Returns false when the key is not tracked.
    pub fn set_status(&self, key: ScanProgressKey, status: ScanStatus) -> bool {
        match self.entries.get_mut(&key) {
            Some(mut entry) => {
                entry.status = status;
                entry.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Snapshot for `(scan_id, user_id)`. A scan started by another user is
    /// reported exactly like an unknown scan.
    pub fn get_scan_progress(
        &self,
        scan_id: ScanId,
        user_id: UserId,
    ) -> Result<ScanProgress> {
        let key = ScanProgressKey::new(scan_id, user_id);
        self.entries
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or(ScanError::ScanProgressNotFound { scan_id, user_id })
    }

    pub fn discard(&self, key: &ScanProgressKey) -> Option<ScanProgress> {
        self.entries.remove(key).map(|(_, progress)| progress)
    }

    pub fn active_keys(&self) -> Vec<ScanProgressKey> {
        self.entries
            .iter()
            .filter(|entry| entry.status.is_active())
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
