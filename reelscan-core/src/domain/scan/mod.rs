//! Library scan domain: the `LibraryScan` aggregate, per-type scanners, the
//! change-detection ledger and live progress.

pub mod aggregates;
pub mod config;
pub mod events;
pub mod job;
pub mod ledger;
pub mod progress;
pub mod repositories;
pub mod scanner;

pub use aggregates::{LibraryScan, LibraryScanError};
pub use config::ScanRuntimeConfig;
pub use events::{DomainEventPublisher, ScanDomainEvent};
pub use job::{JobId, MediaKind, MediaScanJob};
pub use ledger::{ChangeDetector, ContentHasher, PreviousLedger, ScanReport};
pub use progress::ScanProgressTracker;
pub use repositories::{
    LibraryRepository, LibraryScanRepository, ScanHistoryProvider,
    ScanResultRepository,
};
pub use scanner::{
    ExtensionFilter, FileSystem, FsMetadata, InMemoryFs, MediaTypeScanner,
    RealFs, ScannerFactory,
};
