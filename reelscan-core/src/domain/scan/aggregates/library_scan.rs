use chrono::{DateTime, Utc};
use reelscan_model::{LibraryId, ScanId, ScanStatus, ScanSummary, UserId};
use thiserror::Error;

use crate::domain::scan::events::ScanDomainEvent;
use crate::error::ErrorKind;

/// Errors returned by rejected lifecycle transitions.
///
/// A rejected transition never mutates the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LibraryScanError {
    #[error("Library is already being scanned")]
    LibraryAlreadyBeingScanned,

    #[error("Only pending scans can be started")]
    CanOnlyStartPendingScans,

    #[error("Only running scans can be cancelled")]
    CanOnlyCancelRunningScans,

    #[error("Only running scans can be failed")]
    CanOnlyFailRunningScans,

    #[error("Only running scans can be completed")]
    CanOnlyCompleteRunningScans,
}

impl LibraryScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryScanError::LibraryAlreadyBeingScanned => ErrorKind::Conflict,
            _ => ErrorKind::InvalidTransition,
        }
    }
}

/// Library scan aggregate root
///
/// Tracks one scan pass over a library through
/// `Pending -> Running -> {Canceled, Failed, Completed}`. The aggregate holds
/// a read-only projection of the library's other scans so it can refuse to
/// queue or start while another scan of the same library is active.
#[derive(Debug, Clone)]
pub struct LibraryScan {
    id: ScanId,

    library_id: LibraryId,

    /// User that requested the scan
    user_id: UserId,

    status: ScanStatus,

    /// Other scans of the same library, supplied by the caller
    past_scans: Vec<ScanSummary>,

    created_at: DateTime<Utc>,

    updated_at: DateTime<Utc>,

    /// Domain events to be published
    events: Vec<ScanDomainEvent>,
}

impl LibraryScan {
    /// Queue a new scan in `Pending`.
    pub fn queue(
        library_id: LibraryId,
        user_id: UserId,
        past_scans: Vec<ScanSummary>,
    ) -> Result<Self, LibraryScanError> {
        let now = Utc::now();
        let mut scan = Self {
            id: ScanId::new(),
            library_id,
            user_id,
            status: ScanStatus::Pending,
            past_scans,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };

        scan.ensure_no_other_active_scan()?;

        scan.add_event(ScanDomainEvent::ScanQueued {
            scan_id: scan.id,
            library_id,
            user_id,
            timestamp: now,
        });

        Ok(scan)
    }

    /// Rebuild an aggregate loaded from storage. No events are emitted.
    pub fn reconstruct(
        id: ScanId,
        library_id: LibraryId,
        user_id: UserId,
        status: ScanStatus,
        past_scans: Vec<ScanSummary>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            library_id,
            user_id,
            status,
            past_scans,
            created_at,
            updated_at,
            events: Vec::new(),
        }
    }

    /// Replace the history projection, e.g. with a fresh read taken under
    /// the caller's per-library lock right before `start`.
    pub fn refresh_history(&mut self, past_scans: Vec<ScanSummary>) {
        self.past_scans = past_scans;
    }

    /// `Pending -> Running`.
    ///
    /// The active-scan rule is checked again here: another scan may have
    /// been queued between this scan's queue and start.
    pub fn start(&mut self) -> Result<(), LibraryScanError> {
        if self.status != ScanStatus::Pending {
            return Err(LibraryScanError::CanOnlyStartPendingScans);
        }
        self.ensure_no_other_active_scan()?;

        self.transition(ScanStatus::Running);
        self.add_event(ScanDomainEvent::ScanStarted {
            scan_id: self.id,
            library_id: self.library_id,
            user_id: self.user_id,
            timestamp: self.updated_at,
        });
        Ok(())
    }

    /// `Running -> Canceled`.
    pub fn cancel(&mut self) -> Result<(), LibraryScanError> {
        if self.status != ScanStatus::Running {
            return Err(LibraryScanError::CanOnlyCancelRunningScans);
        }

        self.transition(ScanStatus::Canceled);
        self.add_event(ScanDomainEvent::ScanCancelled {
            scan_id: self.id,
            library_id: self.library_id,
            user_id: self.user_id,
            timestamp: self.updated_at,
        });
        Ok(())
    }

    /// `Running -> Failed`. No event is emitted for failures.
    pub fn fail(&mut self) -> Result<(), LibraryScanError> {
        if self.status != ScanStatus::Running {
            return Err(LibraryScanError::CanOnlyFailRunningScans);
        }

        self.transition(ScanStatus::Failed);
        Ok(())
    }

    /// `Running -> Completed`, driven by the execution engine once every job
    /// of the scan has finished.
    pub fn complete(&mut self) -> Result<(), LibraryScanError> {
        if self.status != ScanStatus::Running {
            return Err(LibraryScanError::CanOnlyCompleteRunningScans);
        }

        self.transition(ScanStatus::Completed);
        self.add_event(ScanDomainEvent::ScanCompleted {
            scan_id: self.id,
            library_id: self.library_id,
            user_id: self.user_id,
            timestamp: self.updated_at,
        });
        Ok(())
    }

    fn ensure_no_other_active_scan(&self) -> Result<(), LibraryScanError> {
        let conflict = self
            .past_scans
            .iter()
            .any(|past| past.id != self.id && past.status.is_active());
        if conflict {
            return Err(LibraryScanError::LibraryAlreadyBeingScanned);
        }
        Ok(())
    }

    fn transition(&mut self, status: ScanStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    fn add_event(&mut self, event: ScanDomainEvent) {
        self.events.push(event);
    }

    /// Take all pending events (for publishing)
    pub fn take_events(&mut self) -> Vec<ScanDomainEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[ScanDomainEvent] {
        &self.events
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary::new(self.id, self.library_id, self.status)
    }

    // Getters for read-only access
    pub fn id(&self) -> ScanId {
        self.id
    }
    pub fn library_id(&self) -> LibraryId {
        self.library_id
    }
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
    pub fn status(&self) -> ScanStatus {
        self.status
    }
    pub fn past_scans(&self) -> &[ScanSummary] {
        &self.past_scans
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
