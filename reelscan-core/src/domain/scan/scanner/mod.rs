//! Media-type scanners turn a library into independently runnable jobs.

pub mod factory;
pub mod filter;
pub mod fs;
pub mod movies;
pub mod series;
pub mod settings;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use reelscan_model::{Library, LibraryType, ScanId};

use super::job::{MediaKind, MediaScanJob};

pub use factory::ScannerFactory;
pub use filter::ExtensionFilter;
pub use fs::{FileSystem, FsMetadata, InMemoryFs, RealFs};
pub use movies::MovieScanner;
pub use series::SeriesScanner;

/// Decomposes a library of one declared type into scan jobs.
pub trait MediaTypeScanner: Send + Sync {
    /// The library type this scanner handles.
    fn supported_type(&self) -> LibraryType;

    /// Media kinds produced per content location, in job order.
    fn media_kinds(&self) -> &[MediaKind];

    /// Whether `path` belongs to a job of `kind`.
    fn accepts(&self, kind: MediaKind, path: &Path) -> bool;

    /// Whether a walk should enter `dir`.
    fn should_descend(&self, _dir: &Path) -> bool {
        true
    }

    /// One job per content location and media kind.
    fn create_scan_jobs_for_library(
        self: Arc<Self>,
        scan_id: ScanId,
        library: &Library,
    ) -> Vec<MediaScanJob>;
}

/// Shared decomposition used by the built-in scanners.
///
/// Duplicate roots and roots nested under another root are dropped so each
/// file is claimed by exactly one location.
pub(crate) fn jobs_per_location(
    scanner: Arc<dyn MediaTypeScanner>,
    scan_id: ScanId,
    library: &Library,
) -> Vec<MediaScanJob> {
    let locations = distinct_roots(&library.paths);
    let mut jobs =
        Vec::with_capacity(locations.len() * scanner.media_kinds().len());

    for location in locations {
        for kind in scanner.media_kinds() {
            jobs.push(MediaScanJob::new(
                scan_id,
                library.id,
                location.clone(),
                *kind,
                Arc::clone(&scanner),
            ));
        }
    }

    jobs
}

fn distinct_roots(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        let nested = paths
            .iter()
            .any(|other| other != path && path.starts_with(other));
        if nested || roots.contains(path) {
            continue;
        }
        roots.push(path.clone());
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_roots_drops_duplicates_and_nested_paths() {
        let roots = distinct_roots(&[
            PathBuf::from("/media/films"),
            PathBuf::from("/media/films/4k"),
            PathBuf::from("/media/films"),
            PathBuf::from("/media/docs"),
        ]);
        assert_eq!(
            roots,
            vec![PathBuf::from("/media/films"), PathBuf::from("/media/docs")]
        );
    }
}
