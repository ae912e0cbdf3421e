//! Convenience re-exports for downstream crates.

pub use crate::ids::{LibraryId, ScanId, UserId};
pub use crate::ledger::{
    ChangeCounts, ContentHash, FileChange, ScanResultRecord,
};
pub use crate::library::{Library, LibraryType};
pub use crate::scan::{ScanProgress, ScanProgressKey, ScanStatus, ScanSummary};
