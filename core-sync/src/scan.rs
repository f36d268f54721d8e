//! # Scan Trigger
//!
//! Asks the remote server to rescan its library.
//!
//! A scan is only started when the server is not already scanning, so
//! triggering is idempotent. Failures are logged and reported as a
//! [`ScanOutcome::Failed`]; they never propagate to the host.
//!
//! [`AutoScanHook`] lets hosts report library changes as they happen and
//! triggers a single scan when they are done.

use core_runtime::events::{CoreEvent, EventBus, ScanEvent};
use provider_subsonic::{Authenticator, SubsonicClient};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What a scan request did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The server was already scanning; nothing was requested
    AlreadyScanning,
    /// A scan was started; `count` is the number of tracks the server
    /// reported, when it reported one
    Started { count: Option<u64> },
    Failed { message: String },
}

/// Starts remote library scans
#[derive(Clone)]
pub struct ScanTrigger {
    authenticator: Authenticator,
    client: SubsonicClient,
    event_bus: Arc<EventBus>,
}

impl ScanTrigger {
    pub fn new(
        authenticator: Authenticator,
        client: SubsonicClient,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            authenticator,
            client,
            event_bus,
        }
    }

    /// Start a scan unless one is already running
    #[instrument(skip(self))]
    pub async fn trigger_scan(&self) -> ScanOutcome {
        let outcome = self.request_scan().await;

        let event = match &outcome {
            ScanOutcome::AlreadyScanning => ScanEvent::AlreadyScanning,
            ScanOutcome::Started { count } => ScanEvent::Started {
                count: count.unwrap_or(0),
            },
            ScanOutcome::Failed { message } => ScanEvent::Failed {
                message: message.clone(),
            },
        };
        self.event_bus.emit(CoreEvent::Scan(event)).ok();

        outcome
    }

    async fn request_scan(&self) -> ScanOutcome {
        let credential = match self.authenticator.credential() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Cannot build credential; scan not requested");
                return ScanOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        match self.client.get_scan_status(&credential).await {
            Ok(Some(status)) if status.scanning => {
                info!(count = ?status.count, "Remote library is already scanning");
                return ScanOutcome::AlreadyScanning;
            }
            Ok(_) => debug!("Remote library is idle"),
            Err(e) => {
                warn!(error = %e, "Failed to read scan status");
                return ScanOutcome::Failed {
                    message: e.to_string(),
                };
            }
        }

        match self.client.start_scan(&credential).await {
            Ok(status) => {
                let count = status.and_then(|status| status.count);
                match count {
                    Some(count) => info!("Scanning {} tracks", count),
                    None => info!("Remote library scan started"),
                }
                ScanOutcome::Started { count }
            }
            Err(e) => {
                warn!(error = %e, "Failed to start scan");
                ScanOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Triggers one scan at the end of a session in which the library changed
pub struct AutoScanHook {
    trigger: ScanTrigger,
    enabled: bool,
    changed: AtomicBool,
}

impl AutoScanHook {
    pub fn new(trigger: ScanTrigger, enabled: bool) -> Self {
        Self {
            trigger,
            enabled,
            changed: AtomicBool::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record that the host library changed
    pub fn library_changed(&self) {
        self.changed.store(true, Ordering::SeqCst);
    }

    pub fn has_pending_changes(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    /// Trigger the pending scan, if any
    ///
    /// Returns `None` when auto-scan is disabled or nothing changed since
    /// the last call.
    pub async fn finish(&self) -> Option<ScanOutcome> {
        if !self.enabled {
            return None;
        }
        if !self.changed.swap(false, Ordering::SeqCst) {
            debug!("Library unchanged; skipping auto-scan");
            return None;
        }

        Some(self.trigger.trigger_scan().await)
    }
}
