//! Adapters for the scan ports.

pub mod memory;

pub use memory::{
    InMemoryLibraryRepository, InMemoryScanResultRepository,
    InMemoryScanStore, RecordingEventPublisher,
};
