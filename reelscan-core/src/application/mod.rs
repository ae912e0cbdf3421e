pub mod library_locks;
pub mod scan_coordinator;
pub mod unit_of_work;

pub use library_locks::LibraryLocks;
pub use scan_coordinator::{ScanCoordinator, ScanRun};
pub use unit_of_work::{InMemoryAdapters, ScanUnitOfWork};
