//! Per-file signatures recorded during a scan.

use std::{fmt, str::FromStr};

use crate::chrono::{DateTime, Utc};
use crate::error::ModelError;

use super::ids::ScanId;

/// Deterministic 64-bit digest of a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ContentHash(pub u64);

impl ContentHash {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s.trim(), 16)
            .map(ContentHash)
            .map_err(|err| ModelError::InvalidRecord(format!("hash: {err}")))
    }
}

/// Ledger entry: one file observed during one scan.
///
/// Records are written once and never mutated; the next scan supersedes them
/// with records of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanResultRecord {
    pub scan_id: ScanId,
    /// Unique within one scan's result set.
    pub path: String,
    pub content_hash: ContentHash,
    pub file_size: u64,
    pub last_modified: DateTime<Utc>,
}

impl ScanResultRecord {
    pub fn new(
        scan_id: ScanId,
        path: impl Into<String>,
        content_hash: ContentHash,
        file_size: u64,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            scan_id,
            path: path.into(),
            content_hash,
            file_size,
            last_modified,
        }
    }

    /// Cheap pre-filter: size and modified time both match.
    pub fn metadata_matches(
        &self,
        file_size: u64,
        last_modified: DateTime<Utc>,
    ) -> bool {
        self.file_size == file_size && self.last_modified == last_modified
    }
}

/// Classification of a path relative to the previous completed scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileChange {
    New,
    Changed,
    Unchanged,
    Deleted,
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileChange::New => write!(f, "new"),
            FileChange::Changed => write!(f, "changed"),
            FileChange::Unchanged => write!(f, "unchanged"),
            FileChange::Deleted => write!(f, "deleted"),
        }
    }
}

/// Per-classification tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeCounts {
    pub new: u64,
    pub changed: u64,
    pub unchanged: u64,
    pub deleted: u64,
}

impl ChangeCounts {
    pub fn record(&mut self, change: FileChange) {
        self.add(change, 1);
    }

    pub fn add(&mut self, change: FileChange, amount: u64) {
        let slot = match change {
            FileChange::New => &mut self.new,
            FileChange::Changed => &mut self.changed,
            FileChange::Unchanged => &mut self.unchanged,
            FileChange::Deleted => &mut self.deleted,
        };
        *slot = slot.saturating_add(amount);
    }

    pub fn get(&self, change: FileChange) -> u64 {
        match change {
            FileChange::New => self.new,
            FileChange::Changed => self.changed,
            FileChange::Unchanged => self.unchanged,
            FileChange::Deleted => self.deleted,
        }
    }

    /// Files observed on disk during the scan (deleted paths excluded).
    pub fn observed(&self) -> u64 {
        self.new + self.changed + self.unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_displays_as_fixed_width_hex() {
        let hash = ContentHash(0xabc);
        assert_eq!(hash.to_string(), "0000000000000abc");
        assert_eq!(hash.to_string().parse::<ContentHash>().unwrap(), hash);
    }

    #[test]
    fn metadata_match_requires_size_and_time() {
        let modified = Utc::now();
        let record = ScanResultRecord::new(
            ScanId::new(),
            "/a/b.txt",
            ContentHash(1),
            100,
            modified,
        );
        assert!(record.metadata_matches(100, modified));
        assert!(!record.metadata_matches(101, modified));
        assert!(
            !record.metadata_matches(100, modified + chrono::Duration::seconds(1))
        );
    }

    #[test]
    fn change_counts_tally_by_kind() {
        let mut counts = ChangeCounts::default();
        counts.record(FileChange::New);
        counts.record(FileChange::New);
        counts.record(FileChange::Deleted);
        assert_eq!(counts.get(FileChange::New), 2);
        assert_eq!(counts.observed(), 2);
        assert_eq!(counts.deleted, 1);
    }
}
