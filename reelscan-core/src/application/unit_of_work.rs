use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use crate::domain::scan::events::DomainEventPublisher;
use crate::domain::scan::repositories::{
    LibraryRepository, LibraryScanRepository, ScanHistoryProvider,
    ScanResultRepository,
};
use crate::infrastructure::memory::{
    InMemoryLibraryRepository, InMemoryScanResultRepository,
    InMemoryScanStore, RecordingEventPublisher,
};

/// Aggregates the ports the scan coordinator depends on.
#[derive(Clone)]
pub struct ScanUnitOfWork {
    pub libraries: Arc<dyn LibraryRepository>,
    pub scans: Arc<dyn LibraryScanRepository>,
    pub history: Arc<dyn ScanHistoryProvider>,
    pub results: Arc<dyn ScanResultRepository>,
    pub events: Arc<dyn DomainEventPublisher>,
}

impl fmt::Debug for ScanUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanUnitOfWork")
            .field("libraries", &type_name_of_val(self.libraries.as_ref()))
            .field("scans", &type_name_of_val(self.scans.as_ref()))
            .field("history", &type_name_of_val(self.history.as_ref()))
            .field("results", &type_name_of_val(self.results.as_ref()))
            .field("events", &type_name_of_val(self.events.as_ref()))
            .finish()
    }
}

/// Concrete in-memory adapters, kept so callers can inspect state after
/// handing the ports to a coordinator.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAdapters {
    pub libraries: InMemoryLibraryRepository,
    pub scans: InMemoryScanStore,
    pub results: InMemoryScanResultRepository,
    pub events: RecordingEventPublisher,
}

impl InMemoryAdapters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit_of_work(&self) -> ScanUnitOfWork {
        ScanUnitOfWork {
            libraries: Arc::new(self.libraries.clone()),
            scans: Arc::new(self.scans.clone()),
            history: Arc::new(self.scans.clone()),
            results: Arc::new(self.results.clone()),
            events: Arc::new(self.events.clone()),
        }
    }
}
