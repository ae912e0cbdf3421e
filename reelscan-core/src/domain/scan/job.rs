use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use reelscan_model::{LibraryId, LibraryType, ScanId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scanner::MediaTypeScanner;

/// Unique identifier for scan jobs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of media a job looks for inside its content location.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MediaKind {
    Movie = 0,
    Episode = 1,
    Subtitle = 2,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Episode => write!(f, "episode"),
            MediaKind::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// One schedulable unit of scan work: a single content location walked for
/// a single media kind.
///
/// Jobs are ephemeral; they are produced when a scan starts and dropped once
/// the execution engine has run them.
#[derive(Clone)]
pub struct MediaScanJob {
    id: JobId,
    scan_id: ScanId,
    library_id: LibraryId,
    location: PathBuf,
    media_kind: MediaKind,
    scanner: Arc<dyn MediaTypeScanner>,
}

impl fmt::Debug for MediaScanJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaScanJob")
            .field("id", &self.id)
            .field("scan_id", &self.scan_id)
            .field("library_id", &self.library_id)
            .field("location", &self.location)
            .field("media_kind", &self.media_kind)
            .field("scanner", &self.scanner.supported_type())
            .finish()
    }
}

impl MediaScanJob {
    pub fn new(
        scan_id: ScanId,
        library_id: LibraryId,
        location: PathBuf,
        media_kind: MediaKind,
        scanner: Arc<dyn MediaTypeScanner>,
    ) -> Self {
        Self {
            id: JobId::new(),
            scan_id,
            library_id,
            location,
            media_kind,
            scanner,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn scan_id(&self) -> ScanId {
        self.scan_id
    }

    pub fn library_id(&self) -> LibraryId {
        self.library_id
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    pub fn library_type(&self) -> LibraryType {
        self.scanner.supported_type()
    }

    pub fn scanner(&self) -> &Arc<dyn MediaTypeScanner> {
        &self.scanner
    }

    /// Whether the job's scanner claims `path` for this job's media kind.
    pub fn accepts(&self, path: &Path) -> bool {
        self.scanner.accepts(self.media_kind, path)
    }
}
