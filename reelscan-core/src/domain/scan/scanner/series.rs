use std::{path::Path, sync::Arc};

use reelscan_model::{Library, LibraryType, ScanId};

use super::{ExtensionFilter, MediaTypeScanner, jobs_per_location};
use crate::domain::scan::job::{MediaKind, MediaScanJob};

const SERIES_KINDS: &[MediaKind] = &[MediaKind::Episode, MediaKind::Subtitle];

/// Scanner for TV libraries: episode files plus subtitle sidecars.
#[derive(Debug, Clone)]
pub struct SeriesScanner {
    filter: Arc<ExtensionFilter>,
}

impl SeriesScanner {
    pub fn new(filter: Arc<ExtensionFilter>) -> Self {
        Self { filter }
    }
}

impl MediaTypeScanner for SeriesScanner {
    fn supported_type(&self) -> LibraryType {
        LibraryType::Series
    }

    fn media_kinds(&self) -> &[MediaKind] {
        SERIES_KINDS
    }

    fn accepts(&self, kind: MediaKind, path: &Path) -> bool {
        match kind {
            MediaKind::Episode => self.filter.is_video(path),
            MediaKind::Subtitle => self.filter.is_subtitle(path),
            MediaKind::Movie => false,
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
