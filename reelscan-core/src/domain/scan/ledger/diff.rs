use std::collections::HashSet;

use reelscan_model::{ChangeCounts, FileChange, LibraryId, ScanId, ScanStatus};
use serde::{Deserialize, Serialize};

use super::PreviousLedger;

/// Paths recorded by the previous scan but not observed by the current one.
pub fn deleted_paths(
    previous: &PreviousLedger,
    observed: &HashSet<String>,
) -> Vec<String> {
    let mut deleted: Vec<String> = previous
        .paths()
        .filter(|path| !observed.contains(*path))
        .map(str::to_string)
        .collect();
    deleted.sort();
    deleted
}

/// Final classification of a scan relative to the previous completed scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: ScanId,
    pub library_id: LibraryId,
    pub status: ScanStatus,
    pub new: Vec<String>,
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
    pub counts: ChangeCounts,
    /// Files whose content had to be hashed.
    pub files_hashed: u64,
}

impl ScanReport {
    pub fn new(scan_id: ScanId, library_id: LibraryId) -> Self {
        Self {
            scan_id,
            library_id,
            status: ScanStatus::Running,
            new: Vec::new(),
            changed: Vec::new(),
            unchanged: Vec::new(),
            deleted: Vec::new(),
            counts: ChangeCounts::default(),
            files_hashed: 0,
        }
    }

    pub fn push(&mut self, change: FileChange, path: String) {
        self.counts.record(change);
        match change {
            FileChange::New => self.new.push(path),
            FileChange::Changed => self.changed.push(path),
            FileChange::Unchanged => self.unchanged.push(path),
            FileChange::Deleted => self.deleted.push(path),
        }
    }

    /// Sort for deterministic output
    pub fn sort(&mut self) {
        self.new.sort();
        self.changed.sort();
        self.unchanged.sort();
        self.deleted.sort();
    }

    pub fn has_changes(&self) -> bool {
        self.counts.new + self.counts.changed + self.counts.deleted > 0
    }
}
