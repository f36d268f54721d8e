//! Typed events for scans, sync batches and library writes.
//!
//! The coordinator and the scan trigger publish onto a single [`EventBus`]
//! backed by `tokio::sync::broadcast`. Hosts subscribe to render progress or
//! refresh views; nothing in the core waits on a subscriber.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ScanEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(32);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Scan(ScanEvent::Started { count: 1200 })).ok();
//!
//! assert_eq!(
//!     rx.recv().await.unwrap(),
//!     CoreEvent::Scan(ScanEvent::Started { count: 1200 })
//! );
//! # }
//! ```
//!
//! A receiver that falls more than the bus capacity behind gets
//! `RecvError::Lagged` once and then resumes with the newest events.
//! Emitting with no receivers returns `SendError`; publishers discard it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Capacity used by [`EventBus::default`].
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Everything the sync core publishes on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Remote library scan events
    Scan(ScanEvent),
    /// Batch operation events
    Sync(SyncEvent),
    /// Host library write events
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Short label used in host-side activity logs.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Scan(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Scan(ScanEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Scan(ScanEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Ordered so hosts can drop everything below a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Events emitted by the remote scan trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ScanEvent {
    /// The server was already scanning; nothing was started.
    AlreadyScanning,
    /// A scan was started.
    Started {
        /// Number of tracks the server reported for the scan.
        count: u64,
    },
    /// The scan could not be checked or started.
    Failed {
        /// Human-readable error message.
        message: String,
    },
}

impl ScanEvent {
    fn description(&self) -> &str {
        match self {
            ScanEvent::AlreadyScanning => "Remote library already scanning",
            ScanEvent::Started { .. } => "Remote library scan started",
            ScanEvent::Failed { .. } => "Remote library scan failed",
        }
    }
}

/// Batch operation kinds reported in sync events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    ResolveIds,
    PushRatings,
    PushScrobbles,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::ResolveIds => "resolve_ids",
            SyncOperation::PushRatings => "push_ratings",
            SyncOperation::PushScrobbles => "push_scrobbles",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events describing the lifecycle of a batch operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Batch accepted and credential built.
    Started {
        /// Unique batch identifier.
        job_id: String,
        /// Which batch operation is running.
        operation: SyncOperation,
        /// Number of submitted items.
        total: u64,
    },
    /// One item finished (in any outcome).
    Progress {
        /// Unique batch identifier.
        job_id: String,
        /// Items observed so far.
        processed: u64,
        /// Number of submitted items.
        total: u64,
        /// Completion percentage (0-100).
        percent: f64,
    },
    /// Every submitted item has been observed.
    Completed {
        /// Unique batch identifier.
        job_id: String,
        /// Which batch operation ran.
        operation: SyncOperation,
        /// Items that reached their goal.
        succeeded: u64,
        /// Items skipped (already resolved, missing data, no match).
        skipped: u64,
        /// Items whose remote call failed.
        failed: u64,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
    },
    /// The batch was aborted before any item ran.
    Failed {
        /// Unique batch identifier.
        job_id: String,
        /// Human-readable error message.
        message: String,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync batch started",
            SyncEvent::Progress { .. } => "Sync batch progress",
            SyncEvent::Completed { .. } => "Sync batch completed",
            SyncEvent::Failed { .. } => "Sync batch failed",
        }
    }
}

/// Events describing writes made through the host library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A track's fields were persisted.
    TrackUpdated {
        /// Host track identifier.
        track_id: String,
        /// Names of the fields that changed.
        updated_fields: Vec<String>,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::TrackUpdated { .. } => "Track updated",
        }
    }
}

/// Broadcast channel shared by every publisher in the core.
///
/// Cloning shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` bounds how far a receiver may fall behind before lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fails only when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Receives events emitted from now on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

type EventPredicate = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that can skip events a host does not care about.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let batches = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    predicate: Option<EventPredicate>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            predicate: None,
        }
    }

    /// Replaces any earlier predicate.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    fn wants(&self, event: &CoreEvent) -> bool {
        self.predicate.as_ref().map_or(true, |keep| keep(event))
    }

    /// Waits for the next event the predicate keeps.
    ///
    /// Lag and closure are passed through unchanged.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wants(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` once drained.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(missed)) => return Some(Err(RecvError::Lagged(missed))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}
