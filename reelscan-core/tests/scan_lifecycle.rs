use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reelscan_core::domain::scan::scanner::fs::{FileReader, ReadDirStream};
use reelscan_core::domain::scan::{
    FsMetadata, LibraryRepository, LibraryScanRepository, ScanResultRepository,
};
use reelscan_core::{
    ErrorKind, FileSystem, InMemoryAdapters, InMemoryFs, LibraryScanError,
    RealFs, ScanCoordinator, ScanError, ScanReport, ScanRuntimeConfig,
};
use reelscan_model::{Library, LibraryType, ScanId, ScanStatus, UserId};
use tokio::sync::{Notify, Semaphore};

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// Which calls a [`GatedFs`] parks until released.
#[derive(Clone)]
enum Gate {
    Open,
    ReadDir(PathBuf),
}

/// `InMemoryFs` whose gated calls wait for [`GatedFs::release_all`].
#[derive(Clone)]
struct GatedFs {
    inner: InMemoryFs,
    gate: Gate,
    parked: Arc<Notify>,
    release: Arc<Semaphore>,
}

impl GatedFs {
    fn new(inner: InMemoryFs, gate: Gate) -> Self {
        Self {
            inner,
            gate,
            parked: Arc::new(Notify::new()),
            release: Arc::new(Semaphore::new(0)),
        }
    }

    async fn park(&self) {
        self.parked.notify_one();
        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
    }

    /// Resolves once some job is parked on the gate.
    async fn wait_parked(&self) {
        self.parked.notified().await;
    }

    fn release_all(&self) {
        self.release.add_permits(64);
    }
}

#[async_trait]
impl FileSystem for GatedFs {
    async fn path_exists(&self, path: &Path) -> bool {
        self.inner.path_exists(path).await
    }

    async fn read_dir(
        &self,
        path: &Path,
    ) -> reelscan_core::Result<Box<dyn ReadDirStream + Send>> {
        if matches!(&self.gate, Gate::ReadDir(dir) if dir == path) {
            self.park().await;
        }
        self.inner.read_dir(path).await
    }

    async fn metadata(&self, path: &Path) -> reelscan_core::Result<FsMetadata> {
        self.inner.metadata(path).await
    }

    async fn open(&self, path: &Path) -> reelscan_core::Result<FileReader> {
        if matches!(self.gate, Gate::Open) {
            self.park().await;
        }
        self.inner.open(path).await
    }
}

struct Harness {
    adapters: InMemoryAdapters,
    fs: InMemoryFs,
    coordinator: ScanCoordinator,
    owner: UserId,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(ScanRuntimeConfig::default())
    }

    fn with_config(config: ScanRuntimeConfig) -> Self {
        let adapters = InMemoryAdapters::new();
        let fs = InMemoryFs::new();
        let coordinator = ScanCoordinator::new(
            &config,
            adapters.unit_of_work(),
            Arc::new(fs.clone()),
        );
        Self {
            adapters,
            fs,
            coordinator,
            owner: UserId::new(),
        }
    }

    fn gated(gate: Gate) -> (Self, GatedFs) {
        let adapters = InMemoryAdapters::new();
        let fs = InMemoryFs::new();
        let gated = GatedFs::new(fs.clone(), gate);
        let coordinator = ScanCoordinator::new(
            &ScanRuntimeConfig::default(),
            adapters.unit_of_work(),
            Arc::new(gated.clone()),
        );
        let harness = Self {
            adapters,
            fs,
            coordinator,
            owner: UserId::new(),
        };
        (harness, gated)
    }

    async fn status_of(&self, scan_id: ScanId) -> ScanStatus {
        self.adapters
            .scans
            .find_by_id(scan_id)
            .await
            .unwrap()
            .unwrap()
            .status()
    }

    async fn library(&self, library_type: LibraryType, paths: &[&str]) -> Library {
        let library = Library::new(
            "Test Library",
            library_type,
            paths.iter().map(Into::into).collect(),
            self.owner,
        );
        self.adapters.libraries.save(&library).await.unwrap();
        library
    }

    async fn scan(&self, library: &Library) -> ScanReport {
        self.coordinator
            .scan_library(library.id, self.owner)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap()
    }

    fn seed_movies(&self) {
        self.fs.add_file("/media/movies/Heat (1995)/Heat.mkv", "heat", at(100));
        self.fs.add_file("/media/movies/Heat (1995)/Heat.srt", "subs", at(100));
        self.fs.add_file("/media/movies/Ronin (1998)/Ronin.mp4", "ronin", at(100));
        self.fs.add_file("/media/movies/Ronin (1998)/notes.txt", "ignored", at(100));
        self.fs.add_file("/media/movies/.trash/Old.mkv", "hidden", at(100));
        self.fs.add_file("/media/movies/Ronin (1998)/sample.mkv", "sample", at(100));
    }
}

#[tokio::test]
async fn first_scan_classifies_every_file_as_new() {
    let harness = Harness::new();
    harness.seed_movies();
    let library = harness.library(LibraryType::Movies, &["/media/movies"]).await;

    let report = harness.scan(&library).await;

    assert_eq!(report.status, ScanStatus::Completed);
    assert_eq!(
        report.new,
        vec![
            "/media/movies/Heat (1995)/Heat.mkv".to_string(),
            "/media/movies/Heat (1995)/Heat.srt".to_string(),
            "/media/movies/Ronin (1998)/Ronin.mp4".to_string(),
        ]
    );
    assert_eq!(report.counts.new, 3);
    assert_eq!(report.files_hashed, 3);
    assert!(report.changed.is_empty() && report.deleted.is_empty());

    let records = harness
        .adapters
        .results
        .results_for_scan(report.scan_id)
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|record| record.scan_id == report.scan_id));

    let names = harness.adapters.events.names_by_scan().await;
    assert_eq!(
        names[&report.scan_id],
        vec!["scan_queued", "scan_started", "scan_completed"]
    );
}

#[tokio::test]
async fn unchanged_rescan_skips_hashing() {
    let harness = Harness::new();
    harness.seed_movies();
    let library = harness.library(LibraryType::Movies, &["/media/movies"]).await;

    harness.scan(&library).await;
    let opens_after_first = harness.fs.open_count();

    let report = harness.scan(&library).await;

    assert_eq!(report.status, ScanStatus::Completed);
    assert_eq!(report.counts.unchanged, 3);
    assert!(!report.has_changes());
    assert_eq!(report.files_hashed, 0);
    assert_eq!(harness.fs.open_count(), opens_after_first);
}

#[tokio::test]
async fn rescan_detects_changed_new_and_deleted_files() {
    let harness = Harness::new();
    harness.seed_movies();
    let library = harness.library(LibraryType::Movies, &["/media/movies"]).await;
    harness.scan(&library).await;

    // Rewritten content.
    harness
        .fs
        .add_file("/media/movies/Heat (1995)/Heat.mkv", "heat-remux", at(200));
    // Touched only: same bytes, new mtime.
    harness.fs.touch("/media/movies/Heat (1995)/Heat.srt".as_ref(), at(300));
    harness
        .fs
        .remove("/media/movies/Ronin (1998)/Ronin.mp4".as_ref());
    harness
        .fs
        .add_file("/media/movies/Alien (1979)/Alien.mkv", "alien", at(400));

    let report = harness.scan(&library).await;

    assert_eq!(report.changed, vec!["/media/movies/Heat (1995)/Heat.mkv"]);
    assert_eq!(report.unchanged, vec!["/media/movies/Heat (1995)/Heat.srt"]);
    assert_eq!(report.new, vec!["/media/movies/Alien (1979)/Alien.mkv"]);
    assert_eq!(report.deleted, vec!["/media/movies/Ronin (1998)/Ronin.mp4"]);
    // Heat.mkv, Heat.srt (mtime drift) and Alien.mkv.
    assert_eq!(report.files_hashed, 3);

    // The deleted file is absent from the new ledger.
    let baseline = harness
        .adapters
        .results
        .previous_ledger(library.id)
        .await
        .unwrap();
    assert_eq!(baseline.scan_id(), Some(report.scan_id));
    assert_eq!(baseline.len(), 3);
    assert!(baseline.get("/media/movies/Ronin (1998)/Ronin.mp4").is_none());
}

#[tokio::test]
async fn library_without_locations_completes_empty() {
    let harness = Harness::new();
    let library = harness.library(LibraryType::Series, &[]).await;

    let report = harness.scan(&library).await;

    assert_eq!(report.status, ScanStatus::Completed);
    assert_eq!(report.counts.observed(), 0);
    assert_eq!(harness.adapters.results.record_count(), 0);
}

#[tokio::test]
async fn series_library_scans_episodes_and_subtitles() {
    let harness = Harness::new();
    harness
        .fs
        .add_file("/media/tv/Show/Season 1/S01E01.mkv", "e1", at(10));
    harness
        .fs
        .add_file("/media/tv/Show/Season 1/S01E01.en.srt", "s1", at(10));
    harness
        .fs
        .add_file("/media/tv-extra/Other/S01E01.mkv", "o1", at(10));
    let library = harness
        .library(LibraryType::Series, &["/media/tv", "/media/tv-extra"])
        .await;

    let report = harness.scan(&library).await;

    assert_eq!(report.status, ScanStatus::Completed);
    assert_eq!(report.counts.new, 3);
}

#[tokio::test]
async fn second_queue_for_same_library_conflicts() {
    let harness = Harness::new();
    let library = harness.library(LibraryType::Movies, &["/media/movies"]).await;

    harness
        .coordinator
        .queue_scan(library.id, harness.owner)
        .await
        .unwrap();
    let err = harness
        .coordinator
        .queue_scan(library.id, UserId::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScanError::Lifecycle(LibraryScanError::LibraryAlreadyBeingScanned)
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queues_admit_exactly_one_scan() {
    let harness = Harness::new();
    let library = harness.library(LibraryType::Movies, &["/media/movies"]).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let coordinator = harness.coordinator.clone();
        let library_id = library.id;
        handles.push(tokio::spawn(async move {
            coordinator.queue_scan(library_id, UserId::new()).await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::Conflict),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(harness.adapters.scans.len(), 1);
}

#[tokio::test]
async fn cancelled_scan_never_becomes_the_baseline() {
    let harness = Harness::new();
    harness.seed_movies();
    let library = harness.library(LibraryType::Movies, &["/media/movies"]).await;

    let run = harness
        .coordinator
        .scan_library(library.id, harness.owner)
        .await
        .unwrap();
    // Current-thread runtime: the run has not been polled yet.
    harness.coordinator.cancel_scan(run.scan_id()).await.unwrap();
    let report = run.wait().await.unwrap();

    assert_eq!(report.status, ScanStatus::Canceled);
    let baseline = harness
        .adapters
        .results
        .previous_ledger(library.id)
        .await
        .unwrap();
    assert!(baseline.is_empty());

    let names = harness.adapters.events.names_by_scan().await;
    assert_eq!(
        names[&report.scan_id],
        vec!["scan_queued", "scan_started", "scan_cancelled"]
    );

    // A terminal scan no longer blocks the library.
    let next = harness.scan(&library).await;
    assert_eq!(next.status, ScanStatus::Completed);
    assert_eq!(next.counts.new, 3);
}

#[tokio::test]
async fn cancelling_mid_scan_stops_jobs_between_files() {
    let (harness, gated) = Harness::gated(Gate::Open);
    harness.fs.add_file("/media/movies/Alien (1979)/Alien.mkv", "alien", at(10));
    harness.fs.add_file("/media/movies/Heat (1995)/Heat.mkv", "heat", at(10));
    harness.fs.add_file("/media/movies/Ronin (1998)/Ronin.mkv", "ronin", at(10));
    let library = harness.library(LibraryType::Movies, &["/media/movies"]).await;

    let run = harness
        .coordinator
        .scan_library(library.id, harness.owner)
        .await
        .unwrap();
    // The movie job is now hashing its first file.
    gated.wait_parked().await;
    harness.coordinator.cancel_scan(run.scan_id()).await.unwrap();
    gated.release_all();
    let report = run.wait().await.unwrap();

    assert_eq!(report.status, ScanStatus::Canceled);
    assert_eq!(harness.status_of(report.scan_id).await, ScanStatus::Canceled);
    // Only the file in flight was read; the rest were never opened.
    assert_eq!(harness.fs.open_count(), 1);

    let progress = harness
        .coordinator
        .get_scan_progress(report.scan_id, harness.owner)
        .unwrap();
    assert_eq!(progress.status, ScanStatus::Canceled);
    assert_eq!(progress.total, 3);
    assert!(progress.completed < progress.total);

    let baseline = harness
        .adapters
        .results
        .previous_ledger(library.id)
        .await
        .unwrap();
    assert!(baseline.is_empty());
    assert!(harness.adapters.results.latest_completed(library.id).is_none());

    let names = harness.adapters.events.names_by_scan().await;
    assert_eq!(
        names[&report.scan_id],
        vec!["scan_queued", "scan_started", "scan_cancelled"]
    );
}

#[tokio::test]
async fn shutdown_during_walk_fails_the_scan() {
    let (harness, gated) =
        Harness::gated(Gate::ReadDir(PathBuf::from("/media/movies/B")));
    harness.fs.add_file("/media/movies/A/A.mkv", "a", at(10));
    harness.fs.add_file("/media/movies/B/B.mkv", "b", at(10));
    let library = harness.library(LibraryType::Movies, &["/media/movies"]).await;

    let run = harness
        .coordinator
        .scan_library(library.id, harness.owner)
        .await
        .unwrap();
    gated.wait_parked().await;
    harness.coordinator.shutdown();
    gated.release_all();
    let report = run.wait().await.unwrap();

    assert_eq!(report.status, ScanStatus::Failed);
    assert_eq!(harness.status_of(report.scan_id).await, ScanStatus::Failed);
    assert_eq!(report.counts.observed(), 0);
    assert_eq!(harness.fs.open_count(), 0);
    assert!(!harness.coordinator.is_running(report.scan_id));
    assert!(
        harness
            .adapters
            .results
            .previous_ledger(library.id)
            .await
            .unwrap()
            .is_empty()
    );
    let names = harness.adapters.events.names_by_scan().await;
    assert_eq!(names[&report.scan_id], vec!["scan_queued", "scan_started"]);
}

#[tokio::test]
async fn start_after_shutdown_is_refused() {
    let harness = Harness::new();
    let library = harness.library(LibraryType::Movies, &[]).await;
    harness.coordinator.shutdown();

    let scan_id = harness
        .coordinator
        .queue_scan(library.id, harness.owner)
        .await
        .unwrap();
    let err = harness.coordinator.start_scan(scan_id).await.unwrap_err();

    assert!(matches!(err, ScanError::Cancelled(_)));
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(harness.status_of(scan_id).await, ScanStatus::Pending);
    assert!(!harness.coordinator.is_running(scan_id));
}

#[tokio::test]
async fn cancelling_a_finished_scan_is_rejected() {
    let harness = Harness::new();
    let library = harness.library(LibraryType::Movies, &[]).await;
    let report = harness.scan(&library).await;

    let err = harness
        .coordinator
        .cancel_scan(report.scan_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScanError::Lifecycle(LibraryScanError::CanOnlyCancelRunningScans)
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let err = harness.coordinator.fail_scan(report.scan_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn missing_location_fails_the_scan() {
    let harness = Harness::new();
    harness.seed_movies();
    let library = harness
        .library(LibraryType::Movies, &["/media/movies", "/media/unmounted"])
        .await;

    let report = harness.scan(&library).await;

    assert_eq!(report.status, ScanStatus::Failed);
    assert!(
        harness
            .adapters
            .results
            .previous_ledger(library.id)
            .await
            .unwrap()
            .is_empty()
    );
    let names = harness.adapters.events.names_by_scan().await;
    assert_eq!(names[&report.scan_id], vec!["scan_queued", "scan_started"]);
}

#[tokio::test]
async fn unsupported_library_type_is_rejected_before_queueing() {
    let harness = Harness::new();
    let library = harness.library(LibraryType::Music, &["/media/music"]).await;

    let err = harness
        .coordinator
        .queue_scan(library.id, harness.owner)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScanError::UnsupportedLibraryType(LibraryType::Music)
    ));
    assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
    assert!(harness.adapters.scans.is_empty());
}

#[tokio::test]
async fn unknown_library_and_scan_are_not_found() {
    let harness = Harness::new();
    let library = Library::new("Ghost", LibraryType::Movies, vec![], harness.owner);

    let err = harness
        .coordinator
        .queue_scan(library.id, harness.owner)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::LibraryNotFound(id) if id == library.id));

    let unknown = reelscan_model::ScanId::new();
    let err = harness.coordinator.start_scan(unknown).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = harness.coordinator.wait_for_scan(unknown).await.unwrap_err();
    assert!(matches!(err, ScanError::ScanNotFound(_)));
}

#[tokio::test]
async fn progress_is_scoped_to_the_requesting_user() {
    let harness = Harness::new();
    harness.seed_movies();
    let library = harness.library(LibraryType::Movies, &["/media/movies"]).await;

    let report = harness.scan(&library).await;

    let progress = harness
        .coordinator
        .get_scan_progress(report.scan_id, harness.owner)
        .unwrap();
    assert_eq!(progress.status, ScanStatus::Completed);
    assert_eq!(progress.total, 3);
    assert_eq!(progress.completed, 3);
    assert_eq!(progress.changes.new, 3);
    assert_eq!(progress.percent(), 100.0);

    let stranger = UserId::new();
    let err = harness
        .coordinator
        .get_scan_progress(report.scan_id, stranger)
        .unwrap_err();
    assert!(matches!(
        err,
        ScanError::ScanProgressNotFound { user_id, .. } if user_id == stranger
    ));
}

#[tokio::test]
async fn zero_retention_drops_progress_when_the_scan_ends() {
    let harness = Harness::with_config(ScanRuntimeConfig {
        progress_retention_secs: 0,
        ..ScanRuntimeConfig::default()
    });
    let library = harness.library(LibraryType::Movies, &[]).await;

    let report = harness.scan(&library).await;

    assert_eq!(report.status, ScanStatus::Completed);
    assert!(
        harness
            .coordinator
            .get_scan_progress(report.scan_id, harness.owner)
            .is_err()
    );
    assert!(harness.coordinator.progress().is_empty());
}

#[tokio::test]
async fn zero_retention_releases_every_report() {
    let harness = Harness::with_config(ScanRuntimeConfig {
        progress_retention_secs: 0,
        ..ScanRuntimeConfig::default()
    });
    let library = harness.library(LibraryType::Movies, &[]).await;

    let mut last = None;
    for _ in 0..50 {
        let report = harness.scan(&library).await;
        assert_eq!(report.status, ScanStatus::Completed);
        last = Some(report.scan_id);
    }

    assert_eq!(harness.coordinator.retained_reports(), 0);
    let err = harness
        .coordinator
        .wait_for_scan(last.unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::ScanNotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn reports_are_released_when_retention_elapses() {
    let harness = Harness::with_config(ScanRuntimeConfig {
        progress_retention_secs: 30,
        ..ScanRuntimeConfig::default()
    });
    let library = harness.library(LibraryType::Movies, &[]).await;

    let report = harness.scan(&library).await;
    assert_eq!(harness.coordinator.retained_reports(), 1);
    assert!(harness.coordinator.wait_for_scan(report.scan_id).await.is_ok());

    tokio::time::sleep(Duration::from_secs(31)).await;

    assert_eq!(harness.coordinator.retained_reports(), 0);
    assert!(matches!(
        harness.coordinator.wait_for_scan(report.scan_id).await,
        Err(ScanError::ScanNotFound(_))
    ));
    assert!(
        harness
            .coordinator
            .get_scan_progress(report.scan_id, harness.owner)
            .is_err()
    );
}

#[tokio::test]
async fn extension_in_both_lists_is_scanned_once() {
    let harness = Harness::with_config(ScanRuntimeConfig {
        subtitle_extensions: vec!["srt".to_string(), "mkv".to_string()],
        ..ScanRuntimeConfig::default()
    });
    harness.fs.add_file("/m/Film/Film.mkv", "film", at(1));
    harness.fs.add_file("/m/Film/Film.srt", "subs", at(1));
    let library = harness.library(LibraryType::Movies, &["/m"]).await;

    let report = harness.scan(&library).await;

    assert_eq!(report.status, ScanStatus::Completed);
    assert_eq!(report.counts.new, 2);
    let records = harness
        .adapters
        .results
        .results_for_scan(report.scan_id)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn wait_for_scan_returns_the_same_report_as_the_handle() {
    let harness = Harness::new();
    harness.seed_movies();
    let library = harness.library(LibraryType::Movies, &["/media/movies"]).await;

    let run = harness
        .coordinator
        .scan_library(library.id, harness.owner)
        .await
        .unwrap();
    let scan_id = run.scan_id();
    let from_handle = run.wait().await.unwrap();
    let from_lookup = harness.coordinator.wait_for_scan(scan_id).await.unwrap();

    assert_eq!(from_handle, from_lookup);
    assert!(!harness.coordinator.is_running(scan_id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn real_filesystem_rescan_sees_rewritten_file() {
    let dir = tempfile::tempdir().unwrap();
    let movie_dir = dir.path().join("Heat (1995)");
    std::fs::create_dir_all(&movie_dir).unwrap();
    let movie = movie_dir.join("Heat.mkv");
    std::fs::write(&movie, b"original").unwrap();
    std::fs::write(movie_dir.join("Heat.srt"), b"subs").unwrap();

    let adapters = InMemoryAdapters::new();
    let coordinator = ScanCoordinator::new(
        &ScanRuntimeConfig::default(),
        adapters.unit_of_work(),
        Arc::new(RealFs::new()),
    );
    let owner = UserId::new();
    let library = Library::new(
        "Movies",
        LibraryType::Movies,
        vec![dir.path().to_path_buf()],
        owner,
    );
    adapters.libraries.save(&library).await.unwrap();

    let first = coordinator
        .scan_library(library.id, owner)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(first.counts.new, 2);

    // Different length, so the fast path cannot apply even if the mtime
    // resolution hides the rewrite.
    std::fs::write(&movie, b"a much longer rewrite").unwrap();

    let second = coordinator
        .scan_library(library.id, owner)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(second.status, ScanStatus::Completed);
    assert_eq!(second.changed, vec![movie.to_string_lossy().into_owned()]);
    assert_eq!(second.counts.unchanged, 1);
}
