use reelscan_model::{LibraryId, LibraryType, ScanId, UserId};
use thiserror::Error;

use crate::domain::scan::aggregates::LibraryScanError;

/// Coarse classification of failures, independent of the concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The operation would violate the single-active-scan rule.
    Conflict,
    /// The aggregate's current status does not permit the operation.
    InvalidTransition,
    /// No scanner is registered for the library type.
    UnsupportedConfiguration,
    NotFound,
    Io,
    Cancelled,
    Internal,
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Lifecycle(#[from] LibraryScanError),

    #[error("No scanner is available for {0} libraries")]
    UnsupportedLibraryType(LibraryType),

    #[error("Scan not found: {0}")]
    ScanNotFound(ScanId),

    #[error("Library not found: {0}")]
    LibraryNotFound(LibraryId),

    #[error("No progress recorded for scan {scan_id} (user {user_id})")]
    ScanProgressNotFound { scan_id: ScanId, user_id: UserId },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Filesystem error: {0}")]
    FileSystem(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::Lifecycle(err) => err.kind(),
            ScanError::UnsupportedLibraryType(_) => {
                ErrorKind::UnsupportedConfiguration
            }
            ScanError::ScanNotFound(_)
            | ScanError::LibraryNotFound(_)
            | ScanError::ScanProgressNotFound { .. } => ErrorKind::NotFound,
            ScanError::Io(_) | ScanError::FileSystem(_) => ErrorKind::Io,
            ScanError::Cancelled(_) => ErrorKind::Cancelled,
            ScanError::Repository(_) | ScanError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
