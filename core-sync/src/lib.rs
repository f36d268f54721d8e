//! # Sync Module
//!
//! Orchestrates synchronization between the host library and a Subsonic
//! server.
//!
//! ## Components
//!
//! - **Worker Pool** (`pool`): Bounded-width execution of per-track work with
//!   completion-order results attributed to their items
//! - **Batch Jobs** (`job`): Job identifiers, per-track outcomes and reports
//! - **Sync Coordinator** (`coordinator`): Resolve ids, push ratings and push
//!   scrobbles over a batch of tracks
//! - **Scan Trigger** (`scan`): Idempotent remote library scans and the
//!   auto-scan hook

pub mod coordinator;
pub mod error;
pub mod job;
pub mod pool;
pub mod scan;

pub use coordinator::{ProgressSink, SyncConfig, SyncCoordinator};
pub use error::{Result, SyncError, WorkerError};
pub use job::{BatchReport, ItemOutcome, ItemReport, SkipReason, SyncJobId};
pub use pool::{Completions, WorkResult, WorkerPool, DEFAULT_POOL_WIDTH};
pub use scan::{AutoScanHook, ScanOutcome, ScanTrigger};
