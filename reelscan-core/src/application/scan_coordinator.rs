//! Runs library scans end to end.
//!
//! The coordinator owns the only code paths that move a [`LibraryScan`]
//! through its lifecycle. Every transition happens under the library's lock
//! from [`LibraryLocks`]: history is read, the aggregate is mutated and
//! persisted, then the lock is released and buffered events are published.
//!
//! A started scan fans out into one task per [`MediaScanJob`]. Jobs share a
//! process-wide semaphore, classify files against the previous completed
//! ledger and append their records as they go. When the last job returns the
//! run is finalized: completed when every job succeeded, failed otherwise,
//! left alone when someone cancelled or failed it in the meantime.

use std::any::type_name_of_val;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reelscan_model::{
    FileChange, Library, LibraryId, ScanId, ScanProgress, ScanProgressKey,
    ScanStatus, UserId,
};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use super::library_locks::LibraryLocks;
use super::unit_of_work::ScanUnitOfWork;
use crate::domain::scan::aggregates::LibraryScan;
use crate::domain::scan::config::ScanRuntimeConfig;
use crate::domain::scan::job::MediaScanJob;
use crate::domain::scan::ledger::detector::path_key;
use crate::domain::scan::ledger::{
    ChangeDetector, ContentHasher, PreviousLedger, ScanReport, deleted_paths,
};
use crate::domain::scan::progress::ScanProgressTracker;
use crate::domain::scan::scanner::{FileSystem, FsMetadata, ScannerFactory};
use crate::error::{Result, ScanError};

/// Records handed to the result repository per append.
const APPEND_BATCH: usize = 256;

type ReportSlot = watch::Receiver<Option<Arc<ScanReport>>>;

/// Handle to a started scan.
#[derive(Debug, Clone)]
pub struct ScanRun {
    scan_id: ScanId,
    report: ReportSlot,
}

impl ScanRun {
    pub fn scan_id(&self) -> ScanId {
        self.scan_id
    }

    /// Wait for the run to reach a terminal state.
    pub async fn wait(mut self) -> Result<ScanReport> {
        let scan_id = self.scan_id;
        let slot = self
            .report
            .wait_for(Option::is_some)
            .await
            .map_err(|_| {
                ScanError::Internal(format!(
                    "scan {scan_id} ended without a report"
                ))
            })?;
        slot.as_deref().cloned().ok_or_else(|| {
            ScanError::Internal(format!("scan {scan_id} report missing"))
        })
    }
}

#[derive(Debug, Clone)]
pub struct ScanCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    uow: ScanUnitOfWork,
    fs: Arc<dyn FileSystem>,
    factory: ScannerFactory,
    detector: ChangeDetector,
    progress: Arc<ScanProgressTracker>,
    locks: LibraryLocks,
    permits: Arc<Semaphore>,
    runs: DashMap<ScanId, CancellationToken>,
    reports: Arc<DashMap<ScanId, ReportSlot>>,
    retention: Duration,
    shutdown: CancellationToken,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanCoordinator")
            .field("uow", &self.uow)
            .field("fs", &type_name_of_val(self.fs.as_ref()))
            .field("available_permits", &self.permits.available_permits())
            .field("runs", &self.runs.len())
            .field("reports", &self.reports.len())
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

struct RunContext {
    scan_id: ScanId,
    library_id: LibraryId,
    user_id: UserId,
    previous: PreviousLedger,
    token: CancellationToken,
}

impl RunContext {
    fn progress_key(&self) -> ScanProgressKey {
        ScanProgressKey::new(self.scan_id, self.user_id)
    }
}

#[derive(Debug, Default)]
struct JobOutcome {
    changes: Vec<(FileChange, String)>,
    hashed: u64,
}

impl ScanCoordinator {
    pub fn new(
        config: &ScanRuntimeConfig,
        uow: ScanUnitOfWork,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self::with_progress(
            config,
            uow,
            fs,
            Arc::new(ScanProgressTracker::new()),
        )
    }

    /// Share an existing progress store, e.g. one also read by a status
    /// endpoint.
    pub fn with_progress(
        config: &ScanRuntimeConfig,
        uow: ScanUnitOfWork,
        fs: Arc<dyn FileSystem>,
        progress: Arc<ScanProgressTracker>,
    ) -> Self {
        let inner = Inner {
            uow,
            fs,
            factory: ScannerFactory::new(config),
            detector: ChangeDetector::new(ContentHasher::new(
                config.hash_buffer_bytes,
            )),
            progress,
            locks: LibraryLocks::new(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1))),
            runs: DashMap::new(),
            reports: Arc::new(DashMap::new()),
            retention: Duration::from_secs(config.progress_retention_secs),
            shutdown: CancellationToken::new(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn progress(&self) -> &Arc<ScanProgressTracker> {
        &self.inner.progress
    }

    /// Queue a scan of `library_id` on behalf of `user_id`.
    #[instrument(skip(self), err)]
    pub async fn queue_scan(
        &self,
        library_id: LibraryId,
        user_id: UserId,
    ) -> Result<ScanId> {
        let library = self.inner.load_library(library_id).await?;
        if !self.inner.factory.supports(library.library_type) {
            return Err(ScanError::UnsupportedLibraryType(library.library_type));
        }

        let mut scan = {
            let _guard = self.inner.locks.lock(library_id).await;
            let past_scans = self.inner.uow.history.past_scans(library_id).await?;
            let scan = LibraryScan::queue(library_id, user_id, past_scans)?;
            self.inner.uow.scans.save(&scan).await?;
            scan
        };

        info!(scan_id = %scan.id(), library = %library.name, "scan queued");
        self.inner.publish(&mut scan).await;
        Ok(scan.id())
    }

    /// Move a pending scan to running and launch its jobs.
    #[instrument(skip(self), err)]
    pub async fn start_scan(&self, scan_id: ScanId) -> Result<ScanRun> {
        if self.inner.shutdown.is_cancelled() {
            return Err(ScanError::Cancelled(
                "coordinator is shut down".to_string(),
            ));
        }
        let library_id = self.inner.load_scan(scan_id).await?.library_id();
        let library = self.inner.load_library(library_id).await?;
        let jobs = self.inner.factory.create_scan_jobs(scan_id, &library)?;

        let token = self.inner.shutdown.child_token();
        let (mut scan, previous) = {
            let _guard = self.inner.locks.lock(library_id).await;
            let mut scan = self.inner.load_scan(scan_id).await?;
            let past_scans = self.inner.uow.history.past_scans(library_id).await?;
            scan.refresh_history(past_scans);
            scan.start()?;
            let previous =
                self.inner.uow.results.previous_ledger(library_id).await?;
            self.inner.uow.scans.save(&scan).await?;
            // Registered before the lock drops so a cancel can reach it.
            self.inner.runs.insert(scan_id, token.clone());
            (scan, previous)
        };

        let (report_tx, report_rx) = watch::channel(None);
        self.inner.reports.insert(scan_id, report_rx.clone());

        let ctx = RunContext {
            scan_id,
            library_id,
            user_id: scan.user_id(),
            previous,
            token,
        };
        self.inner
            .progress
            .begin(ctx.progress_key(), library_id, ScanStatus::Running);
        self.inner.progress.expect_walks(
            ctx.progress_key(),
            u32::try_from(jobs.len()).unwrap_or(u32::MAX),
        );

        info!(
            %scan_id,
            library = %library.name,
            jobs = jobs.len(),
            baseline = ?ctx.previous.scan_id(),
            "scan started"
        );
        self.inner.publish(&mut scan).await;

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let report = Arc::clone(&inner).run(ctx, jobs).await;
            inner.runs.remove(&scan_id);
            // Receivers may all be gone; the report stays in `reports`.
            let _ = report_tx.send(Some(Arc::new(report)));
        });

        Ok(ScanRun {
            scan_id,
            report: report_rx,
        })
    }

    /// Queue and immediately start a scan.
    pub async fn scan_library(
        &self,
        library_id: LibraryId,
        user_id: UserId,
    ) -> Result<ScanRun> {
        let scan_id = self.queue_scan(library_id, user_id).await?;
        self.start_scan(scan_id).await
    }

    /// `Running -> Canceled`. In-flight jobs stop at their next file; the
    /// partial ledger is never promoted to baseline.
    #[instrument(skip(self), err)]
    pub async fn cancel_scan(&self, scan_id: ScanId) -> Result<()> {
        let mut scan = self
            .inner
            .transition(scan_id, |scan| scan.cancel().map_err(Into::into))
            .await?;
        self.inner.stop_run(scan_id);
        info!(%scan_id, "scan cancelled");
        self.inner.publish(&mut scan).await;
        Ok(())
    }

    /// `Running -> Failed`, for callers that detect a fault outside the
    /// scan's own jobs.
    #[instrument(skip(self), err)]
    pub async fn fail_scan(&self, scan_id: ScanId) -> Result<()> {
        let mut scan = self
            .inner
            .transition(scan_id, |scan| scan.fail().map_err(Into::into))
            .await?;
        self.inner.stop_run(scan_id);
        warn!(%scan_id, "scan marked failed");
        self.inner.publish(&mut scan).await;
        Ok(())
    }

    pub fn get_scan_progress(
        &self,
        scan_id: ScanId,
        user_id: UserId,
    ) -> Result<ScanProgress> {
        self.inner.progress.get_scan_progress(scan_id, user_id)
    }

    /// Wait for a scan started by this coordinator to finish.
    ///
    /// Reports are kept as long as progress snapshots; after that the scan
    /// is reported as not found.
    pub async fn wait_for_scan(&self, scan_id: ScanId) -> Result<ScanReport> {
        let report = self
            .inner
            .reports
            .get(&scan_id)
            .map(|slot| slot.value().clone())
            .ok_or(ScanError::ScanNotFound(scan_id))?;
        ScanRun { scan_id, report }.wait().await
    }

    /// Reports still reachable through [`ScanCoordinator::wait_for_scan`].
    pub fn retained_reports(&self) -> usize {
        self.inner.reports.len()
    }

    /// Whether jobs of `scan_id` are still executing.
    pub fn is_running(&self, scan_id: ScanId) -> bool {
        self.inner.runs.contains_key(&scan_id)
    }

    /// Stop every in-flight run. Their scans end up `Failed` and later
    /// `start_scan` calls are refused.
    pub fn shutdown(&self) {
        info!(runs = self.inner.runs.len(), "coordinator shutting down");
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    async fn load_scan(&self, scan_id: ScanId) -> Result<LibraryScan> {
        self.uow
            .scans
            .find_by_id(scan_id)
            .await?
            .ok_or(ScanError::ScanNotFound(scan_id))
    }

    async fn load_library(&self, library_id: LibraryId) -> Result<Library> {
        self.uow
            .libraries
            .find_by_id(library_id)
            .await?
            .ok_or(ScanError::LibraryNotFound(library_id))
    }

    /// Load, mutate and persist a scan under its library's lock.
    async fn transition(
        &self,
        scan_id: ScanId,
        apply: impl FnOnce(&mut LibraryScan) -> Result<()>,
    ) -> Result<LibraryScan> {
        let library_id = self.load_scan(scan_id).await?.library_id();
        let _guard = self.locks.lock(library_id).await;
        let mut scan = self.load_scan(scan_id).await?;
        apply(&mut scan)?;
        self.uow.scans.save(&scan).await?;
        self.progress.set_status(
            ScanProgressKey::new(scan_id, scan.user_id()),
            scan.status(),
        );
        Ok(scan)
    }

    fn stop_run(&self, scan_id: ScanId) {
        if let Some(token) = self.runs.get(&scan_id) {
            token.cancel();
        }
    }

    async fn publish(&self, scan: &mut LibraryScan) {
        let events = scan.take_events();
        if events.is_empty() {
            return;
        }
        if let Err(err) = self.uow.events.publish(events).await {
            warn!(scan_id = %scan.id(), error = %err, "failed to publish scan events");
        }
    }

    #[instrument(
        skip_all,
        fields(scan_id = %ctx.scan_id, library_id = %ctx.library_id)
    )]
    async fn run(
        self: Arc<Self>,
        ctx: RunContext,
        jobs: Vec<MediaScanJob>,
    ) -> ScanReport {
        let ctx = Arc::new(ctx);
        let mut set = JoinSet::new();
        for job in jobs {
            let inner = Arc::clone(&self);
            let ctx = Arc::clone(&ctx);
            let token = ctx.token.child_token();
            set.spawn(async move { inner.run_job(&ctx, job, token).await });
        }

        let mut report = ScanReport::new(ctx.scan_id, ctx.library_id);
        let mut observed: HashSet<String> = HashSet::new();
        let mut failure: Option<ScanError> = None;

        while let Some(joined) = set.join_next().await {
            let outcome = match joined {
                Ok(result) => result,
                Err(join_err) => Err(ScanError::Internal(format!(
                    "scan job panicked: {join_err}"
                ))),
            };
            match outcome {
                Ok(outcome) => {
                    report.files_hashed += outcome.hashed;
                    for (change, path) in outcome.changes {
                        observed.insert(path.clone());
                        report.push(change, path);
                    }
                }
                Err(ScanError::Cancelled(reason)) => {
                    debug!(%reason, "job stopped");
                }
                Err(err) => {
                    warn!(error = %err, "scan job failed; stopping siblings");
                    ctx.token.cancel();
                    failure.get_or_insert(err);
                }
            }
        }

        self.finalize(&ctx, report, &observed, failure).await
    }

    async fn finalize(
        &self,
        ctx: &RunContext,
        mut report: ScanReport,
        observed: &HashSet<String>,
        mut failure: Option<ScanError>,
    ) -> ScanReport {
        let key = ctx.progress_key();
        let _guard = self.locks.lock(ctx.library_id).await;

        let mut scan = match self.load_scan(ctx.scan_id).await {
            Ok(scan) => scan,
            Err(err) => {
                error!(error = %err, "could not reload scan to finalize it");
                report.status = ScanStatus::Failed;
                self.progress.set_status(key, report.status);
                self.schedule_release(key);
                return report;
            }
        };

        if scan.status() == ScanStatus::Running {
            if failure.is_none() && ctx.token.is_cancelled() {
                failure = Some(ScanError::Cancelled(
                    "coordinator shut down".to_string(),
                ));
            }
            if failure.is_none()
                && let Err(err) =
                    self.complete(ctx, &mut scan, &mut report, observed).await
            {
                failure = Some(err);
            }
            if let Some(err) = &failure
                && scan.status() == ScanStatus::Running
            {
                error!(error = %err, "scan failed");
                if scan.fail().is_ok()
                    && let Err(save_err) = self.uow.scans.save(&scan).await
                {
                    error!(error = %save_err, "could not persist failed scan");
                }
            }
        } else {
            info!(status = %scan.status(), "scan ended outside its run");
        }

        report.status = scan.status();
        report.sort();
        self.progress.set_status(key, report.status);
        self.publish(&mut scan).await;
        self.schedule_release(key);

        info!(
            status = %report.status,
            new = report.counts.new,
            changed = report.counts.changed,
            unchanged = report.counts.unchanged,
            deleted = report.counts.deleted,
            hashed = report.files_hashed,
            "scan finished"
        );
        report
    }

    async fn complete(
        &self,
        ctx: &RunContext,
        scan: &mut LibraryScan,
        report: &mut ScanReport,
        observed: &HashSet<String>,
    ) -> Result<()> {
        let deleted = deleted_paths(&ctx.previous, observed);
        self.progress.record_changes(
            ctx.progress_key(),
            FileChange::Deleted,
            deleted.len() as u64,
        );
        for path in deleted {
            report.push(FileChange::Deleted, path);
        }

        self.uow
            .results
            .mark_completed(ctx.library_id, ctx.scan_id)
            .await?;
        scan.complete()?;
        self.uow.scans.save(scan).await
    }

    /// Drop the progress snapshot and the report once retention elapses.
    fn schedule_release(&self, key: ScanProgressKey) {
        if self.retention.is_zero() {
            self.progress.discard(&key);
            self.reports.remove(&key.scan_id);
            return;
        }
        let progress = Arc::clone(&self.progress);
        let reports = Arc::clone(&self.reports);
        let retention = self.retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            progress.discard(&key);
            reports.remove(&key.scan_id);
        });
    }

    #[instrument(
        skip_all,
        fields(job_id = %job.id(), kind = %job.media_kind(), location = %job.location().display())
    )]
    async fn run_job(
        &self,
        ctx: &RunContext,
        job: MediaScanJob,
        token: CancellationToken,
    ) -> Result<JobOutcome> {
        let _permit = tokio::select! {
            _ = token.cancelled() => {
                return Err(ScanError::Cancelled(format!(
                    "job {} cancelled before it started",
                    job.id()
                )));
            }
            permit = Arc::clone(&self.permits).acquire_owned() => permit
                .map_err(|_| ScanError::Internal("job permits closed".into()))?,
        };

        let walked = self.collect_files(&job, &token).await;
        self.progress.walk_finished(ctx.progress_key());
        let files = walked?;
        self.progress.record_progress(
            ctx.scan_id,
            ctx.user_id,
            0,
            files.len() as u64,
        );
        debug!(files = files.len(), "job walking complete");

        let key = ctx.progress_key();
        let mut outcome = JobOutcome::default();
        let mut batch = Vec::with_capacity(APPEND_BATCH.min(files.len()));

        for (path, metadata) in files {
            if token.is_cancelled() {
                return Err(ScanError::Cancelled(format!(
                    "job {} cancelled",
                    job.id()
                )));
            }

            let previous = ctx.previous.get(&path_key(&path));
            let classification = match self
                .detector
                .classify(self.fs.as_ref(), ctx.scan_id, &path, &metadata, previous)
                .await
            {
                Ok(classification) => classification,
                Err(err) => {
                    if self.fs.path_exists(&path).await {
                        return Err(err);
                    }
                    warn!(path = %path.display(), error = %err, "file vanished during scan");
                    self.progress.record_progress(ctx.scan_id, ctx.user_id, 1, 0);
                    continue;
                }
            };

            if classification.hashed {
                outcome.hashed += 1;
            }
            self.progress.record_progress(ctx.scan_id, ctx.user_id, 1, 0);
            self.progress.record_change(key, classification.change);
            outcome
                .changes
                .push((classification.change, classification.record.path.clone()));
            batch.push(classification.record);

            if batch.len() >= APPEND_BATCH {
                self.uow
                    .results
                    .append(ctx.scan_id, ctx.library_id, std::mem::take(&mut batch))
                    .await?;
            }
        }

        if !batch.is_empty() {
            self.uow
                .results
                .append(ctx.scan_id, ctx.library_id, batch)
                .await?;
        }
        Ok(outcome)
    }

    /// Depth-first walk of the job's location, keeping files the job
    /// accepts. Symlinked directories are never entered.
    async fn collect_files(
        &self,
        job: &MediaScanJob,
        token: &CancellationToken,
    ) -> Result<Vec<(PathBuf, FsMetadata)>> {
        let root = job.location();
        if !self.fs.path_exists(root).await {
            return Err(ScanError::FileSystem(format!(
                "content location {} does not exist",
                root.display()
            )));
        }

        let mut pending = vec![root.to_path_buf()];
        let mut files = Vec::new();

        while let Some(dir) = pending.pop() {
            if token.is_cancelled() {
                return Err(ScanError::Cancelled(format!(
                    "job {} cancelled while walking",
                    job.id()
                )));
            }

            let mut entries = self.fs.read_dir(&dir).await?;
            while let Some(path) = entries.next_entry().await? {
                let metadata = match self.fs.metadata(&path).await {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                        continue;
                    }
                };

                if metadata.is_dir {
                    if job.scanner().should_descend(&path) {
                        pending.push(path);
                    }
                } else if metadata.is_file && job.accepts(&path) {
                    trace!(path = %path.display(), "accepted");
                    files.push((path, metadata));
                }
            }
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}
