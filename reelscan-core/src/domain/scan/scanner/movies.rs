use std::{path::Path, sync::Arc};

use reelscan_model::{Library, LibraryType, ScanId};

use super::{ExtensionFilter, MediaTypeScanner, jobs_per_location};
use crate::domain::scan::job::{MediaKind, MediaScanJob};

const MOVIE_KINDS: &[MediaKind] = &[MediaKind::Movie, MediaKind::Subtitle];

/// Scanner for movie libraries: feature files plus subtitle sidecars.
#[derive(Debug, Clone)]
pub struct MovieScanner {
    filter: Arc<ExtensionFilter>,
}

impl MovieScanner {
    pub fn new(filter: Arc<ExtensionFilter>) -> Self {
        Self { filter }
    }
}

impl MediaTypeScanner for MovieScanner {
    fn supported_type(&self) -> LibraryType {
        LibraryType::Movies
    }

    fn media_kinds(&self) -> &[MediaKind] {
        MOVIE_KINDS
    }

    fn accepts(&self, kind: MediaKind, path: &Path) -> bool {
        match kind {
            MediaKind::Movie => self.filter.is_video(path),
            MediaKind::Subtitle => self.filter.is_subtitle(path),
            MediaKind::Episode => false,
        }
    }

    fn should_descend(&self, dir: &Path) -> bool {
        self.filter.visible(dir)
    }

    fn create_scan_jobs_for_library(
        self: Arc<Self>,
        scan_id: ScanId,
        library: &Library,
    ) -> Vec<MediaScanJob> {
        jobs_per_location(self, scan_id, library)
    }
}
