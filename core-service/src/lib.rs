//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided HTTP bridge and track store into the
//! sync core. Desktop apps typically enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`) and call [`bootstrap_desktop`];
//! other hosts build [`CoreDependencies`] from their own bridge handles.
//!
//! Every operation is independent: the scan trigger and the three batch
//! operations can be called in any order, and each builds its own
//! credential.

pub mod error;

pub use error::{CoreError, Result};

pub use core_library::{Track, TrackQuery, TrackRepository};
pub use core_runtime::config::SubsonicConfig;
pub use core_runtime::events::{CoreEvent, EventBus, EventStream};
pub use core_sync::{BatchReport, ItemOutcome, ProgressSink, ScanOutcome, SkipReason};

use std::sync::Arc;

use bridge_traits::http::HttpClient;
use core_sync::{AutoScanHook, ScanTrigger, SyncConfig, SyncCoordinator};
use provider_subsonic::{Authenticator, SubsonicClient};
use tracing::{debug, info};

/// Default capacity of the service event bus
const EVENT_BUS_CAPACITY: usize = 256;

/// Aggregated handle to the bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub track_repository: Arc<dyn TrackRepository>,
    pub event_bus: Arc<EventBus>,
    pub progress_sink: Option<Arc<dyn ProgressSink>>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        track_repository: Arc<dyn TrackRepository>,
    ) -> Self {
        Self {
            http_client,
            track_repository,
            event_bus: Arc::new(EventBus::new(EVENT_BUS_CAPACITY)),
            progress_sink: None,
        }
    }

    /// Share an existing event bus instead of creating one.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = Some(sink);
        self
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<SubsonicConfig>,
    deps: Arc<CoreDependencies>,
    coordinator: Arc<SyncCoordinator>,
    scan_trigger: ScanTrigger,
    auto_scan: Arc<AutoScanHook>,
}

impl CoreService {
    /// Create a new service from a validated configuration and the
    /// provided dependencies.
    ///
    /// An unknown authentication mode is not rejected here; it surfaces as
    /// an authentication error when an operation builds its credential.
    pub fn new(config: SubsonicConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let authenticator = Authenticator::from_config(&config);
        let client = SubsonicClient::new(Arc::clone(&deps.http_client), &config);

        let mut coordinator = SyncCoordinator::new(
            SyncConfig::from_subsonic(&config),
            authenticator.clone(),
            client.clone(),
            Arc::clone(&deps.track_repository),
            Arc::clone(&deps.event_bus),
        );
        if let Some(sink) = &deps.progress_sink {
            coordinator = coordinator.with_progress_sink(Arc::clone(sink));
        }

        let scan_trigger = ScanTrigger::new(authenticator, client, Arc::clone(&deps.event_bus));
        let auto_scan = AutoScanHook::new(scan_trigger.clone(), config.auto_scan);

        info!(
            base_url = %config.base_url(),
            user = %config.user,
            max_concurrent = config.max_concurrent,
            auto_scan = config.auto_scan,
            "Subsonic sync service ready"
        );

        Ok(Self {
            config: Arc::new(config),
            deps: Arc::new(deps),
            coordinator: Arc::new(coordinator),
            scan_trigger,
            auto_scan: Arc::new(auto_scan),
        })
    }

    pub fn config(&self) -> &SubsonicConfig {
        &self.config
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    /// Subscribe to scan, sync and library events.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.deps.event_bus.subscribe())
    }

    /// Start a remote library scan unless one is already running.
    pub async fn trigger_scan(&self) -> ScanOutcome {
        self.scan_trigger.trigger_scan().await
    }

    pub async fn resolve_ids(&self, tracks: Vec<Track>, force: bool) -> Result<BatchReport> {
        Ok(self.coordinator.resolve_ids(tracks, force).await?)
    }

    pub async fn push_ratings(
        &self,
        tracks: Vec<Track>,
        rating_field: &str,
    ) -> Result<BatchReport> {
        Ok(self.coordinator.push_ratings(tracks, rating_field).await?)
    }

    pub async fn push_scrobbles(&self, tracks: Vec<Track>) -> Result<BatchReport> {
        Ok(self.coordinator.push_scrobbles(tracks).await?)
    }

    /// Tracks matching a query such as `artist:beatles album:"help!"`.
    pub async fn select_tracks(&self, query: &str) -> Result<Vec<Track>> {
        let query = TrackQuery::parse(query)?;
        let tracks = self.deps.track_repository.find_matching(&query).await?;
        debug!(query = %query, matched = tracks.len(), "Selected tracks");
        Ok(tracks)
    }

    pub async fn resolve_ids_matching(&self, query: &str, force: bool) -> Result<BatchReport> {
        let tracks = self.select_tracks(query).await?;
        self.resolve_ids(tracks, force).await
    }

    pub async fn push_ratings_matching(
        &self,
        query: &str,
        rating_field: &str,
    ) -> Result<BatchReport> {
        let tracks = self.select_tracks(query).await?;
        self.push_ratings(tracks, rating_field).await
    }

    pub async fn push_scrobbles_matching(&self, query: &str) -> Result<BatchReport> {
        let tracks = self.select_tracks(query).await?;
        self.push_scrobbles(tracks).await
    }

    /// Record that the host library changed during this session.
    pub fn library_changed(&self) {
        self.auto_scan.library_changed();
    }

    /// End-of-session hook: triggers one scan if auto-scan is enabled and
    /// the library changed.
    pub async fn finish(&self) -> Option<ScanOutcome> {
        self.auto_scan.finish().await
    }
}

/// Convenience bootstrapper for desktop hosts using the `reqwest` bridge.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # fn example(repository: std::sync::Arc<dyn core_service::TrackRepository>) -> core_service::Result<()> {
/// use core_service::{bootstrap_desktop, SubsonicConfig};
///
/// let config = SubsonicConfig::builder()
///     .url("http://localhost:4533")
///     .user("admin")
///     .password("secret")
///     .build()?;
/// let _core = bootstrap_desktop(config, repository)?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    config: SubsonicConfig,
    track_repository: Arc<dyn TrackRepository>,
) -> Result<CoreService> {
    let http_client = bridge_desktop::ReqwestHttpClient::with_timeout(config.timeout())?;
    CoreService::new(
        config,
        CoreDependencies::new(Arc::new(http_client), track_repository),
    )
}
