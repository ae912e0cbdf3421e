//! In-process adapters for the scan ports.
//!
//! Used by the CLI (which persists the ledger itself between runs) and by
//! tests. Each store is cheap to clone; clones share state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reelscan_model::{
    Library, LibraryId, ScanId, ScanResultRecord, ScanStatus, ScanSummary,
    UserId,
};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::domain::scan::aggregates::LibraryScan;
use crate::domain::scan::events::{DomainEventPublisher, ScanDomainEvent};
use crate::domain::scan::ledger::PreviousLedger;
use crate::domain::scan::repositories::{
    LibraryRepository, LibraryScanRepository, ScanHistoryProvider,
    ScanResultRepository,
};
use crate::error::{Result, ScanError};

#[derive(Debug, Clone, Copy)]
struct StoredScan {
    library_id: LibraryId,
    user_id: UserId,
    status: ScanStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Scan aggregates keyed by id. Doubles as the history provider so the
/// active-scan rule always sees what was last saved.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScanStore {
    scans: Arc<DashMap<ScanId, StoredScan>>,
}

impl InMemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    fn summaries_for(&self, library_id: LibraryId) -> Vec<ScanSummary> {
        let mut summaries: Vec<(DateTime<Utc>, ScanSummary)> = self
            .scans
            .iter()
            .filter(|entry| entry.value().library_id == library_id)
            .map(|entry| {
                let stored = entry.value();
                (
                    stored.created_at,
                    ScanSummary::new(*entry.key(), library_id, stored.status),
                )
            })
            .collect();
        summaries.sort_by_key(|(created_at, _)| *created_at);
        summaries.into_iter().map(|(_, summary)| summary).collect()
    }
}

#[async_trait]
impl ScanHistoryProvider for InMemoryScanStore {
    async fn past_scans(&self, library_id: LibraryId) -> Result<Vec<ScanSummary>> {
        Ok(self.summaries_for(library_id))
    }
}

#[async_trait]
impl LibraryScanRepository for InMemoryScanStore {
    async fn find_by_id(&self, scan_id: ScanId) -> Result<Option<LibraryScan>> {
        let Some(stored) = self.scans.get(&scan_id).map(|entry| *entry) else {
            return Ok(None);
        };

        Ok(Some(LibraryScan::reconstruct(
            scan_id,
            stored.library_id,
            stored.user_id,
            stored.status,
            self.summaries_for(stored.library_id),
            stored.created_at,
            stored.updated_at,
        )))
    }

    async fn save(&self, scan: &LibraryScan) -> Result<()> {
        self.scans.insert(
            scan.id(),
            StoredScan {
                library_id: scan.library_id(),
                user_id: scan.user_id(),
                status: scan.status(),
                created_at: scan.created_at(),
                updated_at: scan.updated_at(),
            },
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLibraryRepository {
    libraries: Arc<DashMap<LibraryId, Library>>,
}

impl InMemoryLibraryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LibraryRepository for InMemoryLibraryRepository {
    async fn find_by_id(&self, library_id: LibraryId) -> Result<Option<Library>> {
        Ok(self
            .libraries
            .get(&library_id)
            .map(|entry| entry.value().clone()))
    }

    async fn save(&self, library: &Library) -> Result<()> {
        self.libraries.insert(library.id, library.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ScanLedger {
    records: Vec<ScanResultRecord>,
    paths: HashSet<String>,
}

/// Append-only ledger store with a per-library pointer to the last
/// completed scan.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScanResultRepository {
    ledgers: Arc<DashMap<ScanId, ScanLedger>>,
    completed: Arc<DashMap<LibraryId, ScanId>>,
}

impl InMemoryScanResultRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a completed ledger, e.g. one loaded from disk.
    pub fn import_completed(
        &self,
        library_id: LibraryId,
        scan_id: ScanId,
        records: Vec<ScanResultRecord>,
    ) {
        let paths = records.iter().map(|record| record.path.clone()).collect();
        self.ledgers.insert(
            scan_id,
            ScanLedger {
                records,
                paths,
            },
        );
        self.completed.insert(library_id, scan_id);
        debug!(%library_id, %scan_id, "imported completed ledger");
    }

    /// Last completed scan of `library_id` and its records.
    pub fn latest_completed(
        &self,
        library_id: LibraryId,
    ) -> Option<(ScanId, Vec<ScanResultRecord>)> {
        let scan_id = *self.completed.get(&library_id)?;
        let records = self
            .ledgers
            .get(&scan_id)
            .map(|ledger| ledger.records.clone())
            .unwrap_or_default();
        Some((scan_id, records))
    }

    /// Total records across every scan.
    pub fn record_count(&self) -> usize {
        self.ledgers.iter().map(|ledger| ledger.records.len()).sum()
    }
}

#[async_trait]
impl ScanResultRepository for InMemoryScanResultRepository {
    async fn previous_ledger(
        &self,
        library_id: LibraryId,
    ) -> Result<PreviousLedger> {
        let Some(scan_id) = self.completed.get(&library_id).map(|id| *id)
        else {
            return Ok(PreviousLedger::empty());
        };

        let records = self
            .ledgers
            .get(&scan_id)
            .map(|ledger| ledger.records.clone())
            .unwrap_or_default();
        Ok(PreviousLedger::new(scan_id, records))
    }

    async fn append(
        &self,
        scan_id: ScanId,
        library_id: LibraryId,
        records: Vec<ScanResultRecord>,
    ) -> Result<()> {
        let mut ledger = self.ledgers.entry(scan_id).or_default();

        let mut batch = HashSet::with_capacity(records.len());
        for record in &records {
            if record.scan_id != scan_id {
                return Err(ScanError::Repository(format!(
                    "record for scan {} appended to scan {scan_id}",
                    record.scan_id
                )));
            }
            if ledger.paths.contains(&record.path)
                || !batch.insert(record.path.as_str())
            {
                return Err(ScanError::Repository(format!(
                    "path {} already recorded for scan {scan_id}",
                    record.path
                )));
            }
        }

        let appended = records.len();
        for record in records {
            ledger.paths.insert(record.path.clone());
            ledger.records.push(record);
        }
        trace!(%scan_id, %library_id, appended, "appended scan results");
        Ok(())
    }

    async fn results_for_scan(
        &self,
        scan_id: ScanId,
    ) -> Result<Vec<ScanResultRecord>> {
        Ok(self
            .ledgers
            .get(&scan_id)
            .map(|ledger| ledger.records.clone())
            .unwrap_or_default())
    }

    async fn mark_completed(
        &self,
        library_id: LibraryId,
        scan_id: ScanId,
    ) -> Result<()> {
        // A scan that observed nothing still becomes the baseline.
        self.ledgers.entry(scan_id).or_default();
        self.completed.insert(library_id, scan_id);
        Ok(())
    }
}

/// Keeps every published event in order. Also logs each one.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<ScanDomainEvent>>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<ScanDomainEvent> {
        self.events.lock().await.clone()
    }

    /// Event names per scan, in publish order.
    pub async fn names_by_scan(&self) -> HashMap<ScanId, Vec<&'static str>> {
        let mut names: HashMap<ScanId, Vec<&'static str>> = HashMap::new();
        for event in self.events.lock().await.iter() {
            names.entry(event.scan_id()).or_default().push(event.name());
        }
        names
    }
}

#[async_trait]
impl DomainEventPublisher for RecordingEventPublisher {
    async fn publish(&self, events: Vec<ScanDomainEvent>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        for event in &events {
            info!(event = event.name(), scan_id = %event.scan_id(), "scan event");
        }
        self.events.lock().await.extend(events);
        Ok(())
    }
}
