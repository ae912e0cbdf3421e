use std::sync::Arc;

use reelscan_model::{Library, LibraryType, ScanId};
use tracing::debug;

use super::{ExtensionFilter, MediaTypeScanner, MovieScanner, SeriesScanner};
use crate::{
    domain::scan::{config::ScanRuntimeConfig, job::MediaScanJob},
    error::{Result, ScanError},
};

/// Resolves the scanner for a library's declared type.
///
/// The mapping is total over [`LibraryType`]: types without a scanner yield
/// [`ScanError::UnsupportedLibraryType`] instead of aborting.
#[derive(Debug, Clone)]
pub struct ScannerFactory {
    filter: Arc<ExtensionFilter>,
}

impl Default for ScannerFactory {
    fn default() -> Self {
        Self::new(&ScanRuntimeConfig::default())
    }
}

impl ScannerFactory {
    pub fn new(config: &ScanRuntimeConfig) -> Self {
        Self::with_filter(ExtensionFilter::from_config(config))
    }

    pub fn with_filter(filter: ExtensionFilter) -> Self {
        Self {
            filter: Arc::new(filter),
        }
    }

    pub fn create_scanner(
        &self,
        library_type: LibraryType,
    ) -> Result<Arc<dyn MediaTypeScanner>> {
        match library_type {
            LibraryType::Movies => {
                Ok(Arc::new(MovieScanner::new(Arc::clone(&self.filter))))
            }
            LibraryType::Series => {
                Ok(Arc::new(SeriesScanner::new(Arc::clone(&self.filter))))
            }
            LibraryType::Music | LibraryType::Photos => {
                Err(ScanError::UnsupportedLibraryType(library_type))
            }
        }
    }

    /// Resolve the scanner for `library` and decompose it into jobs.
    pub fn create_scan_jobs(
        &self,
        scan_id: ScanId,
        library: &Library,
    ) -> Result<Vec<MediaScanJob>> {
        let jobs = self
            .create_scanner(library.library_type)?
            .create_scan_jobs_for_library(scan_id, library);

        debug!(
            %scan_id,
            library_id = %library.id,
            library_type = %library.library_type,
            jobs = jobs.len(),
            "decomposed library into scan jobs"
        );
        Ok(jobs)
    }

    pub fn supports(&self, library_type: LibraryType) -> bool {
        self.create_scanner(library_type).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use reelscan_model::UserId;

    use super::*;
    use crate::domain::scan::job::MediaKind;
    use crate::error::ErrorKind;

    fn library(library_type: LibraryType, paths: &[&str]) -> Library {
        Library::new(
            "Test",
            library_type,
            paths.iter().map(PathBuf::from).collect(),
            UserId::new(),
        )
    }

    #[test]
    fn resolves_one_scanner_per_supported_type() {
        let factory = ScannerFactory::default();
        for library_type in [LibraryType::Movies, LibraryType::Series] {
            let scanner = factory.create_scanner(library_type).unwrap();
            assert_eq!(scanner.supported_type(), library_type);
        }
    }

    #[test]
    fn unsupported_types_are_typed_errors() {
        let factory = ScannerFactory::default();
        for library_type in [LibraryType::Music, LibraryType::Photos] {
            let err = factory.create_scanner(library_type).err().unwrap();
            assert!(matches!(
                err,
                ScanError::UnsupportedLibraryType(t) if t == library_type
            ));
            assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
            assert!(!factory.supports(library_type));
        }

        let music = library(LibraryType::Music, &["/media/music"]);
        assert!(factory.create_scan_jobs(ScanId::new(), &music).is_err());
    }

    #[test]
    fn every_library_type_resolves_or_reports() {
        let factory = ScannerFactory::default();
        for library_type in LibraryType::all() {
            match factory.create_scanner(*library_type) {
                Ok(scanner) => {
                    assert_eq!(scanner.supported_type(), *library_type)
                }
                Err(err) => assert!(matches!(
                    err,
                    ScanError::UnsupportedLibraryType(_)
                )),
            }
        }
    }

    #[test]
    fn movie_library_gets_one_job_per_location_and_kind() {
        let factory = ScannerFactory::default();
        let scan_id = ScanId::new();
        let films = library(LibraryType::Movies, &["/media/a", "/media/b"]);

        let jobs = factory.create_scan_jobs(scan_id, &films).unwrap();

        assert_eq!(jobs.len(), 4);
        assert!(jobs.iter().all(|job| job.scan_id() == scan_id));
        assert!(jobs.iter().all(|job| job.library_id() == films.id));
        let kinds: Vec<_> = jobs
            .iter()
            .filter(|job| job.location() == Path::new("/media/a"))
            .map(|job| job.media_kind())
            .collect();
        assert_eq!(kinds, vec![MediaKind::Movie, MediaKind::Subtitle]);
    }

    #[test]
    fn series_jobs_accept_episodes_not_movies() {
        let factory = ScannerFactory::default();
        let shows = library(LibraryType::Series, &["/media/tv"]);
        let jobs = factory.create_scan_jobs(ScanId::new(), &shows).unwrap();

        let episode_job = jobs
            .iter()
            .find(|job| job.media_kind() == MediaKind::Episode)
            .unwrap();
        assert_eq!(episode_job.library_type(), LibraryType::Series);
        assert!(episode_job.accepts(Path::new("/media/tv/Show/S01E01.mkv")));
        assert!(!episode_job.accepts(Path::new("/media/tv/Show/S01E01.srt")));
        assert!(
            !episode_job
                .scanner()
                .accepts(MediaKind::Movie, Path::new("/media/tv/x.mkv"))
        );
    }

    #[test]
    fn library_without_locations_has_no_jobs() {
        let factory = ScannerFactory::default();
        let empty = library(LibraryType::Movies, &[]);
        let jobs = factory.create_scan_jobs(ScanId::new(), &empty).unwrap();
        assert!(jobs.is_empty());
    }
}
