// Scan domain aggregates.
// LibraryScan owns the lifecycle state machine and the active-scan policy;
// mutual exclusion around it is the caller's job.

mod library_scan;

pub use library_scan::{LibraryScan, LibraryScanError};
