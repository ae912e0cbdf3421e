use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reelscan_model::{LibraryId, ScanId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lifecycle events appended by the [`LibraryScan`] aggregate.
///
/// The aggregate only buffers these; callers drain them with
/// `take_events` and hand them to a [`DomainEventPublisher`].
///
/// [`LibraryScan`]: super::aggregates::LibraryScan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanDomainEvent {
    ScanQueued {
        scan_id: ScanId,
        library_id: LibraryId,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    ScanStarted {
        scan_id: ScanId,
        library_id: LibraryId,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    ScanCancelled {
        scan_id: ScanId,
        library_id: LibraryId,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    ScanCompleted {
        scan_id: ScanId,
        library_id: LibraryId,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
}

impl ScanDomainEvent {
    pub fn scan_id(&self) -> ScanId {
        match self {
            ScanDomainEvent::ScanQueued { scan_id, .. }
            | ScanDomainEvent::ScanStarted { scan_id, .. }
            | ScanDomainEvent::ScanCancelled { scan_id, .. }
            | ScanDomainEvent::ScanCompleted { scan_id, .. } => *scan_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanDomainEvent::ScanQueued { .. } => "scan_queued",
            ScanDomainEvent::ScanStarted { .. } => "scan_started",
            ScanDomainEvent::ScanCancelled { .. } => "scan_cancelled",
            ScanDomainEvent::ScanCompleted { .. } => "scan_completed",
        }
    }
}

/// Sink for drained aggregate events. Dispatch and handling live outside
/// the core.
#[async_trait]
pub trait DomainEventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<ScanDomainEvent>) -> Result<()>;
}
