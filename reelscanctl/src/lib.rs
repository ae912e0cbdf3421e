//! Library half of `reelscanctl`: one-shot scans of local directories, with
//! the last completed ledger kept in a JSON file between runs.

pub mod ledger_file;
pub mod scan;

pub use ledger_file::{LEDGER_FORMAT_VERSION, LedgerFile};
pub use scan::{ScanOptions, ScanOutcome, run_scan};
