use std::fmt;

use crate::chrono::{DateTime, Utc};
use crate::ledger::ChangeCounts;

use super::ids::{LibraryId, ScanId, UserId};

/// Lifecycle status of a library scan.
///
/// `Pending` and `Running` are the only non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanStatus {
    Pending,
    Running,
    Canceled,
    Failed,
    Completed,
}

impl ScanStatus {
    /// Whether a scan in this status blocks another scan of the same library.
    pub fn is_active(&self) -> bool {
        matches!(self, ScanStatus::Pending | ScanStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStatus::Pending => write!(f, "pending"),
            ScanStatus::Running => write!(f, "running"),
            ScanStatus::Canceled => write!(f, "canceled"),
            ScanStatus::Failed => write!(f, "failed"),
            ScanStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Read-only projection of a past scan, used to evaluate the
/// one-active-scan-per-library rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanSummary {
    pub id: ScanId,
    pub library_id: LibraryId,
    pub status: ScanStatus,
}

impl ScanSummary {
    pub fn new(id: ScanId, library_id: LibraryId, status: ScanStatus) -> Self {
        Self {
            id,
            library_id,
            status,
        }
    }
}

/// Composite key for live progress: the initiating user is part of the key
/// so progress is only visible to the user that started the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanProgressKey {
    pub scan_id: ScanId,
    pub user_id: UserId,
}

impl ScanProgressKey {
    pub fn new(scan_id: ScanId, user_id: UserId) -> Self {
        Self { scan_id, user_id }
    }
}

impl fmt::Display for ScanProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scan_id, self.user_id)
    }
}

/// Point-in-time snapshot of a running scan's progress.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanProgress {
    pub scan_id: ScanId,
    pub user_id: UserId,
    pub library_id: Option<LibraryId>,
    pub status: ScanStatus,
    /// Files processed so far across all jobs of the scan.
    pub completed: u64,
    /// Files discovered so far across all jobs of the scan.
    pub total: u64,
    /// Jobs that have not finished walking their location yet. `total` can
    /// still grow while this is non-zero.
    #[cfg_attr(feature = "serde", serde(default))]
    pub pending_walks: u32,
    pub changes: ChangeCounts,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScanProgress {
    pub fn new(key: ScanProgressKey, status: ScanStatus) -> Self {
        let now = Utc::now();
        Self {
            scan_id: key.scan_id,
            user_id: key.user_id,
            library_id: None,
            status,
            completed: 0,
            total: 0,
            pending_walks: 0,
            changes: ChangeCounts::default(),
            started_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> ScanProgressKey {
        ScanProgressKey::new(self.scan_id, self.user_id)
    }

    /// Whether an active scan is still discovering files.
    pub fn is_discovering(&self) -> bool {
        self.status.is_active() && self.pending_walks > 0
    }

    /// Completion in the range `0.0..=100.0`. A scan with nothing discovered
    /// yet reports zero.
    ///
    /// Each job adds to `total` only once its own walk is done, so this can
    /// read 100 while sibling jobs are still walking. Check
    /// [`ScanProgress::is_discovering`] before treating it as final.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let ratio = self.completed as f64 / self.total as f64;
        (ratio * 100.0).clamp(0.0, 100.0)
    }
}
