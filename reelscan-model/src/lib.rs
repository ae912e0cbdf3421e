//! Core data model definitions shared across Reelscan crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod error;
pub mod ids;
pub mod ledger;
pub mod library;
pub mod prelude;
pub mod scan;

pub use error::{ModelError, Result as ModelResult};
pub use ids::{LibraryId, ScanId, UserId};
pub use ledger::{ChangeCounts, ContentHash, FileChange, ScanResultRecord};
pub use library::{Library, LibraryType};
pub use scan::{ScanProgress, ScanProgressKey, ScanStatus, ScanSummary};
