use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use reelscan_core::domain::scan::LibraryRepository;
use reelscan_core::{
    InMemoryAdapters, RealFs, ScanCoordinator, ScanReport, ScanRuntimeConfig,
};
use reelscan_model::{Library, LibraryId, LibraryType, ScanStatus, UserId};
use tracing::{info, warn};

use crate::ledger_file::LedgerFile;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub library_type: LibraryType,
    pub roots: Vec<PathBuf>,
    pub ledger_path: PathBuf,
    pub config: ScanRuntimeConfig,
    /// Classify without writing the ledger back.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub report: ScanReport,
    pub library_id: LibraryId,
    pub ledger_written: bool,
}

/// Scan `options.roots` once against the ledger stored at
/// `options.ledger_path`, writing the new ledger back when the scan
/// completes.
pub async fn run_scan(options: &ScanOptions) -> Result<ScanOutcome> {
    let roots = options
        .roots
        .iter()
        .map(|root| {
            std::fs::canonicalize(root).with_context(|| {
                format!("content location {} is not accessible", root.display())
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let adapters = InMemoryAdapters::new();
    let library_id = match LedgerFile::load(&options.ledger_path)? {
        Some(ledger) if ledger.library_type == options.library_type => {
            info!(
                baseline = %ledger.scan_id,
                records = ledger.records.len(),
                "loaded previous ledger"
            );
            let library_id = ledger.library_id;
            adapters
                .results
                .import_completed(library_id, ledger.scan_id, ledger.records);
            library_id
        }
        Some(ledger) => {
            warn!(
                stored = %ledger.library_type,
                requested = %options.library_type,
                "ledger belongs to a different library type; starting fresh"
            );
            LibraryId::new()
        }
        None => LibraryId::new(),
    };

    let owner = UserId::system();
    let library = Library::new(
        options.library_type.to_string(),
        options.library_type,
        roots.clone(),
        owner,
    )
    .with_id(library_id);
    adapters.libraries.save(&library).await?;

    let coordinator = ScanCoordinator::new(
        &options.config,
        adapters.unit_of_work(),
        Arc::new(RealFs::new()),
    );
    let report = coordinator
        .scan_library(library_id, owner)
        .await?
        .wait()
        .await?;

    let mut ledger_written = false;
    if report.status == ScanStatus::Completed && !options.dry_run {
        let (scan_id, records) = adapters
            .results
            .latest_completed(library_id)
            .context("completed scan left no ledger")?;
        LedgerFile::new(library_id, options.library_type, roots, scan_id, records)
            .save(&options.ledger_path)?;
        ledger_written = true;
    }

    Ok(ScanOutcome {
        report,
        library_id,
        ledger_written,
    })
}
