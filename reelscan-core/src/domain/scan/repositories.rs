use async_trait::async_trait;
use reelscan_model::{
    Library, LibraryId, ScanId, ScanResultRecord, ScanSummary,
};

use crate::domain::scan::aggregates::LibraryScan;
use crate::domain::scan::ledger::PreviousLedger;
use crate::error::Result;

/// Source of the scans already known for a library, used by the
/// single-active-scan rule.
#[async_trait]
pub trait ScanHistoryProvider: Send + Sync {
    async fn past_scans(&self, library_id: LibraryId) -> Result<Vec<ScanSummary>>;
}

#[async_trait]
pub trait LibraryScanRepository: Send + Sync {
    async fn find_by_id(&self, scan_id: ScanId) -> Result<Option<LibraryScan>>;
    async fn save(&self, scan: &LibraryScan) -> Result<()>;
}

#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn find_by_id(&self, library_id: LibraryId) -> Result<Option<Library>>;
    async fn save(&self, library: &Library) -> Result<()>;
}

/// Append-only per-scan ledger of observed files.
#[async_trait]
pub trait ScanResultRepository: Send + Sync {
    /// Ledger of the most recent completed scan of `library_id`; empty when
    /// no scan of the library has completed yet.
    async fn previous_ledger(&self, library_id: LibraryId)
    -> Result<PreviousLedger>;

    /// Append records for `scan_id`. A path may appear at most once per
    /// scan; a duplicate is rejected.
    async fn append(
        &self,
        scan_id: ScanId,
        library_id: LibraryId,
        records: Vec<ScanResultRecord>,
    ) -> Result<()>;

    async fn results_for_scan(
        &self,
        scan_id: ScanId,
    ) -> Result<Vec<ScanResultRecord>>;

    /// Promote `scan_id`'s ledger to be the comparison baseline of its
    /// library.
    async fn mark_completed(
        &self,
        library_id: LibraryId,
        scan_id: ScanId,
    ) -> Result<()>;
}
