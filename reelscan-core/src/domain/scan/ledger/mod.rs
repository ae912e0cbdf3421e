//! Change-detection ledger.
//!
//! Two-level detection against the previous completed scan of the same
//! library: size + modified time decide whether hashing can be skipped, the
//! content hash decides whether a file changed.

pub mod detector;
pub mod diff;
pub mod hasher;

use std::collections::HashMap;

use reelscan_model::{ScanId, ScanResultRecord};

pub use detector::{ChangeDetector, Classification};
pub use diff::{ScanReport, deleted_paths};
pub use hasher::{ContentHasher, hash_bytes};

/// Read-only view of the ledger written by a library's last completed scan.
#[derive(Debug, Clone, Default)]
pub struct PreviousLedger {
    scan_id: Option<ScanId>,
    records: HashMap<String, ScanResultRecord>,
}

impl PreviousLedger {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        scan_id: ScanId,
        records: impl IntoIterator<Item = ScanResultRecord>,
    ) -> Self {
        Self {
            scan_id: Some(scan_id),
            records: records
                .into_iter()
                .map(|record| (record.path.clone(), record))
                .collect(),
        }
    }

    /// Scan that produced this ledger, if any scan has completed.
    pub fn scan_id(&self) -> Option<ScanId> {
        self.scan_id
    }

    pub fn get(&self, path: &str) -> Option<&ScanResultRecord> {
        self.records.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
