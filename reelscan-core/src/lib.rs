//! # Reelscan Core
//!
//! Library scan lifecycle and incremental change detection for media
//! libraries.
//!
//! ## Overview
//!
//! - **Scan lifecycle**: the [`LibraryScan`] aggregate enforces at most one
//!   pending or running scan per library and buffers lifecycle events
//! - **Scanners**: per-library-type scanners split a library into one job per
//!   content location and media kind
//! - **Change detection**: each scan writes an append-only ledger; files are
//!   compared with the last completed scan by size and modified time first,
//!   content hash second
//! - **Progress**: a concurrent store of per-`(scan, user)` snapshots that
//!   jobs update while they run
//!
//! ## Architecture
//!
//! - [`domain`]: aggregates, scanners, ledger and the repository ports
//! - [`application`]: the [`ScanCoordinator`] that executes scans
//! - [`infrastructure`]: in-memory adapters for the ports
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reelscan_core::{
//!     InMemoryAdapters, RealFs, ScanCoordinator, ScanRuntimeConfig,
//!     domain::scan::LibraryRepository,
//! };
//! use reelscan_model::{Library, LibraryType, UserId};
//!
//! # async fn run() -> reelscan_core::Result<()> {
//! let adapters = InMemoryAdapters::new();
//! let coordinator = ScanCoordinator::new(
//!     &ScanRuntimeConfig::default(),
//!     adapters.unit_of_work(),
//!     Arc::new(RealFs::new()),
//! );
//!
//! let owner = UserId::new();
//! let library = Library::new(
//!     "Movies",
//!     LibraryType::Movies,
//!     vec!["/srv/media/movies".into()],
//!     owner,
//! );
//! adapters.libraries.save(&library).await?;
//!
//! let report = coordinator.scan_library(library.id, owner).await?.wait().await?;
//! println!("{} new, {} changed", report.counts.new, report.counts.changed);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{InMemoryAdapters, ScanCoordinator, ScanRun, ScanUnitOfWork};
pub use domain::scan::{
    ChangeDetector, ContentHasher, FileSystem, InMemoryFs, LibraryScan,
    LibraryScanError, RealFs, ScanDomainEvent, ScanProgressTracker,
    ScanReport, ScanRuntimeConfig, ScannerFactory,
};
pub use error::{ErrorKind, Result, ScanError};
