//! # Sync Coordinator
//!
//! Orchestrates the batch operations between the host library and a
//! Subsonic server.
//!
//! ## Overview
//!
//! The `SyncCoordinator` runs three independent batch operations over a set
//! of tracks:
//! - **Resolve IDs**: find the remote song for each track and store its id
//! - **Push Ratings**: translate a local rating field and send it with
//!   `setRating`
//! - **Push Scrobbles**: send each track's last play with `scrobble`
//!
//! ## Workflow
//!
//! 1. Build one credential for the whole batch (the only fatal step)
//! 2. Emit `SyncEvent::Started`
//! 3. Run per-track work on a bounded [`WorkerPool`]
//! 4. Attribute each completion to its track, notify the progress sink and
//!    emit `SyncEvent::Progress`
//! 5. Emit `SyncEvent::Completed` and return a [`BatchReport`]
//!
//! Per-track failures never abort the batch; they are logged and recorded
//! as outcomes. Nothing is retried: unresolved tracks must be resubmitted
//! with `force`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncConfig, SyncCoordinator};
//!
//! let coordinator = SyncCoordinator::new(
//!     SyncConfig::default(),
//!     authenticator,
//!     client,
//!     track_repository,
//!     event_bus,
//! );
//!
//! let report = coordinator.resolve_ids(tracks, false).await?;
//! println!("{} resolved, {} skipped", report.succeeded(), report.skipped());
//! ```

use crate::job::{BatchReport, ItemOutcome, ItemReport, SkipReason, SyncJobId};
use crate::pool::WorkerPool;
use crate::Result;
use core_library::{Track, TrackRepository};
use core_runtime::config::SubsonicConfig;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SyncEvent, SyncOperation};
use provider_subsonic::{translate, Authenticator, Credential, Matcher, SubsonicClient};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Width of the worker pool
    pub max_concurrent: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent: crate::pool::DEFAULT_POOL_WIDTH,
        }
    }
}

impl SyncConfig {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn from_subsonic(config: &SubsonicConfig) -> Self {
        Self::default().with_max_concurrent(config.max_concurrent)
    }
}

/// Receives a count-only notification each time a track finishes
pub trait ProgressSink: Send + Sync {
    fn item_completed(&self, processed: usize, total: usize);
}

/// Per-track work of a batch
#[derive(Debug, Clone)]
enum BatchWork {
    ResolveIds { force: bool },
    PushRatings { field: String },
    PushScrobbles,
}

impl BatchWork {
    fn operation(&self) -> SyncOperation {
        match self {
            BatchWork::ResolveIds { .. } => SyncOperation::ResolveIds,
            BatchWork::PushRatings { .. } => SyncOperation::PushRatings,
            BatchWork::PushScrobbles => SyncOperation::PushScrobbles,
        }
    }
}

/// Sync coordinator for batch operations against the remote server
pub struct SyncCoordinator {
    config: SyncConfig,
    authenticator: Authenticator,
    matcher: Matcher,
    track_repository: Arc<dyn TrackRepository>,
    event_bus: Arc<EventBus>,
    progress_sink: Option<Arc<dyn ProgressSink>>,
}

impl SyncCoordinator {
    /// Create a new sync coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - Coordinator configuration
    /// * `authenticator` - Builds the per-batch credential
    /// * `client` - Subsonic API client shared by every worker
    /// * `track_repository` - Store callback for resolved ids
    /// * `event_bus` - Event bus for batch progress events
    pub fn new(
        config: SyncConfig,
        authenticator: Authenticator,
        client: SubsonicClient,
        track_repository: Arc<dyn TrackRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            authenticator,
            matcher: Matcher::new(client),
            track_repository,
            event_bus,
            progress_sink: None,
        }
    }

    /// Attach a sink notified once per finished track
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Resolve and store the remote id of each track
    ///
    /// Tracks that already carry a remote id are skipped without any
    /// network call unless `force` is set. A failed re-resolution leaves a
    /// previously stored id untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Auth`](crate::SyncError::Auth) when no
    /// credential can be built; no request is issued in that case.
    #[instrument(skip(self, tracks), fields(track_count = tracks.len()))]
    pub async fn resolve_ids(&self, tracks: Vec<Track>, force: bool) -> Result<BatchReport> {
        self.run_batch(BatchWork::ResolveIds { force }, tracks).await
    }

    /// Push the value of `rating_field` for each track with `setRating`
    ///
    /// Tracks without a remote id are resolved first and the id is stored.
    /// Tracks lacking the field, or whose value has no 0-5 equivalent, are
    /// skipped.
    #[instrument(skip(self, tracks), fields(track_count = tracks.len()))]
    pub async fn push_ratings(
        &self,
        tracks: Vec<Track>,
        rating_field: &str,
    ) -> Result<BatchReport> {
        self.run_batch(
            BatchWork::PushRatings {
                field: rating_field.to_string(),
            },
            tracks,
        )
        .await
    }

    /// Push each track's last play with `scrobble`
    ///
    /// Tracks without a remote id are resolved first; the id is not stored.
    /// Tracks never played are skipped.
    #[instrument(skip(self, tracks), fields(track_count = tracks.len()))]
    pub async fn push_scrobbles(&self, tracks: Vec<Track>) -> Result<BatchReport> {
        self.run_batch(BatchWork::PushScrobbles, tracks).await
    }

    async fn run_batch(&self, work: BatchWork, tracks: Vec<Track>) -> Result<BatchReport> {
        let job_id = SyncJobId::new();
        let operation = work.operation();
        let started = Instant::now();

        let credential = match self.authenticator.credential() {
            Ok(credential) => Arc::new(credential),
            Err(e) => {
                error!(
                    job_id = %job_id,
                    operation = %operation,
                    error = %e,
                    "Cannot build credential; batch aborted"
                );
                self.event_bus
                    .emit(CoreEvent::Sync(SyncEvent::Failed {
                        job_id: job_id.to_string(),
                        message: e.to_string(),
                    }))
                    .ok();
                return Err(e.into());
            }
        };

        let total = tracks.len();
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Started {
                job_id: job_id.to_string(),
                operation,
                total: total as u64,
            }))
            .ok();

        info!(job_id = %job_id, operation = %operation, total, "Starting batch");

        let track_ids: Vec<String> = tracks.iter().map(|track| track.id.clone()).collect();
        let coordinator = Arc::new(self.clone_for_task());
        let pool = WorkerPool::new(self.config.max_concurrent);
        let mut processed = 0usize;

        let results = pool
            .run(
                tracks,
                |track| {
                    let coordinator = Arc::clone(&coordinator);
                    let credential = Arc::clone(&credential);
                    let work = work.clone();
                    async move { coordinator.process_track(&work, &credential, track).await }
                },
                |_, _| {
                    processed += 1;
                    self.report_progress(job_id, processed, total);
                },
            )
            .await;

        let mut report = BatchReport::new(job_id, operation);
        report.items = results
            .into_iter()
            .zip(track_ids)
            .enumerate()
            .map(|(index, (result, track_id))| {
                let outcome = result.unwrap_or_else(|e| {
                    error!(track_id = %track_id, error = %e, "Track worker failed");
                    ItemOutcome::failed(e.to_string())
                });
                ItemReport {
                    index,
                    track_id,
                    outcome,
                }
            })
            .collect();
        report.duration_ms = started.elapsed().as_millis() as u64;

        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Completed {
                job_id: job_id.to_string(),
                operation,
                succeeded: report.succeeded() as u64,
                skipped: report.skipped() as u64,
                failed: report.failed() as u64,
                duration_ms: report.duration_ms,
            }))
            .ok();

        info!(
            job_id = %job_id,
            operation = %operation,
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            duration_ms = report.duration_ms,
            "Batch completed"
        );

        Ok(report)
    }

    fn report_progress(&self, job_id: SyncJobId, processed: usize, total: usize) {
        if let Some(sink) = &self.progress_sink {
            sink.item_completed(processed, total);
        }

        let percent = if total == 0 {
            100.0
        } else {
            (processed as f64 / total as f64) * 100.0
        };

        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Progress {
                job_id: job_id.to_string(),
                processed: processed as u64,
                total: total as u64,
                percent,
            }))
            .ok();
    }

    /// Clone for worker tasks (avoids Arc<Arc<...>>)
    fn clone_for_task(&self) -> Self {
        Self {
            config: self.config.clone(),
            authenticator: self.authenticator.clone(),
            matcher: self.matcher.clone(),
            track_repository: Arc::clone(&self.track_repository),
            event_bus: Arc::clone(&self.event_bus),
            progress_sink: self.progress_sink.clone(),
        }
    }

    #[instrument(skip_all, fields(track_id = %track.id, operation = %work.operation()))]
    async fn process_track(
        &self,
        work: &BatchWork,
        credential: &Credential,
        track: Track,
    ) -> ItemOutcome {
        match work {
            BatchWork::ResolveIds { force } => self.resolve_track(credential, track, *force).await,
            BatchWork::PushRatings { field } => self.push_rating(credential, track, field).await,
            BatchWork::PushScrobbles => self.push_scrobble(credential, track).await,
        }
    }

    async fn resolve_track(
        &self,
        credential: &Credential,
        mut track: Track,
        force: bool,
    ) -> ItemOutcome {
        if track.has_remote_id() && !force {
            debug!("Remote id already known");
            return ItemOutcome::skipped(SkipReason::AlreadyResolved);
        }

        let Some(remote_id) = self.matcher.resolve_id(&track, credential).await else {
            return ItemOutcome::skipped(SkipReason::Unresolved);
        };

        match self.store_remote_id(&mut track, &remote_id).await {
            Ok(()) => ItemOutcome::Resolved { remote_id },
            Err(message) => ItemOutcome::failed(message),
        }
    }

    async fn push_rating(
        &self,
        credential: &Credential,
        mut track: Track,
        field: &str,
    ) -> ItemOutcome {
        let Some(value) = track.rating(field) else {
            debug!(field = %field, "Track has no value for rating field");
            return ItemOutcome::skipped(SkipReason::MissingRating {
                field: field.to_string(),
            });
        };

        let Some(rating) = translate(value, field) else {
            debug!(field = %field, value, "Rating has no remote equivalent");
            return ItemOutcome::skipped(SkipReason::UntranslatableRating {
                field: field.to_string(),
                value: value.to_string(),
            });
        };

        let remote_id = match self.ensure_remote_id(credential, &mut track, true).await {
            Ok(remote_id) => remote_id,
            Err(outcome) => return outcome,
        };

        match self
            .matcher
            .client()
            .set_rating(credential, &remote_id, rating)
            .await
        {
            Ok(true) => {
                debug!(remote_id = %remote_id, rating, "Rating pushed");
                ItemOutcome::RatingPushed { remote_id, rating }
            }
            Ok(false) => {
                info!(remote_id = %remote_id, "Remote song not found for rating");
                ItemOutcome::skipped(SkipReason::RemoteNotFound)
            }
            Err(e) => {
                warn!(remote_id = %remote_id, error = %e, "Failed to push rating");
                ItemOutcome::failed(e.to_string())
            }
        }
    }

    async fn push_scrobble(&self, credential: &Credential, mut track: Track) -> ItemOutcome {
        let Some(played_at) = track.last_played_at else {
            debug!("Track never played; nothing to scrobble");
            return ItemOutcome::skipped(SkipReason::NeverPlayed);
        };
        let time_ms = played_at.timestamp_millis();

        let remote_id = match self.ensure_remote_id(credential, &mut track, false).await {
            Ok(remote_id) => remote_id,
            Err(outcome) => return outcome,
        };

        match self
            .matcher
            .client()
            .scrobble(credential, &remote_id, time_ms)
            .await
        {
            Ok(true) => {
                debug!(remote_id = %remote_id, time_ms, "Scrobble pushed");
                ItemOutcome::Scrobbled { remote_id, time_ms }
            }
            Ok(false) => {
                info!(remote_id = %remote_id, "Remote song not found for scrobble");
                ItemOutcome::skipped(SkipReason::RemoteNotFound)
            }
            Err(e) => {
                warn!(remote_id = %remote_id, error = %e, "Failed to push scrobble");
                ItemOutcome::failed(e.to_string())
            }
        }
    }

    /// Known remote id, or a freshly resolved one
    ///
    /// With `persist`, a freshly resolved id is stored; a store failure is
    /// logged and the id is still used.
    async fn ensure_remote_id(
        &self,
        credential: &Credential,
        track: &mut Track,
        persist: bool,
    ) -> std::result::Result<String, ItemOutcome> {
        if let Some(remote_id) = track.remote_id.as_deref().filter(|_| track.has_remote_id()) {
            return Ok(remote_id.to_string());
        }

        let remote_id = self
            .matcher
            .resolve_id(track, credential)
            .await
            .ok_or_else(|| ItemOutcome::skipped(SkipReason::Unresolved))?;

        if persist {
            if let Err(message) = self.store_remote_id(track, &remote_id).await {
                warn!(error = %message, "Continuing with unstored remote id");
            }
        }

        Ok(remote_id)
    }

    async fn store_remote_id(
        &self,
        track: &mut Track,
        remote_id: &str,
    ) -> std::result::Result<(), String> {
        track.set_remote_id(remote_id);

        if let Err(e) = self.track_repository.update(track).await {
            warn!(remote_id = %remote_id, error = %e, "Failed to store remote id");
            return Err(format!("Failed to store remote id: {}", e));
        }

        debug!(remote_id = %remote_id, "Stored remote id");
        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::TrackUpdated {
                track_id: track.id.clone(),
                updated_fields: vec!["remote_id".to_string()],
            }))
            .ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_builder() {
        let config = SyncConfig::builder().with_max_concurrent(5);
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(SyncConfig::default().max_concurrent, 3);
    }

    #[test]
    fn test_sync_config_from_subsonic() {
        let subsonic = SubsonicConfig::builder()
            .max_concurrent(8)
            .build()
            .unwrap();
        assert_eq!(SyncConfig::from_subsonic(&subsonic).max_concurrent, 8);
    }

    #[test]
    fn test_batch_work_operation() {
        assert_eq!(
            BatchWork::ResolveIds { force: true }.operation(),
            SyncOperation::ResolveIds
        );
        assert_eq!(
            BatchWork::PushRatings {
                field: "rating".to_string()
            }
            .operation(),
            SyncOperation::PushRatings
        );
        assert_eq!(BatchWork::PushScrobbles.operation(), SyncOperation::PushScrobbles);
    }
}
