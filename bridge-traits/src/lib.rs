//! Host-side capabilities the sync core depends on.
//!
//! The core never opens a socket or writes a log file itself. A host supplies
//! an [`HttpClient`] for Subsonic calls and, optionally, a [`LoggerSink`] that
//! receives mirrored `tracing` events. `bridge-desktop` provides the
//! `reqwest`-backed client; tests substitute stubs or `mockall` mocks.
//!
//! Adapters report failures as [`BridgeError`], keeping timeouts apart from
//! other transport failures. Every trait is `Send + Sync` because one adapter
//! instance is shared by all workers of a batch.
//!
//! ```ignore
//! use async_trait::async_trait;
//! use bridge_traits::{error::Result, HttpClient, HttpRequest, HttpResponse};
//!
//! struct CannedServer(&'static str);
//!
//! #[async_trait]
//! impl HttpClient for CannedServer {
//!     async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
//!         Ok(HttpResponse {
//!             status: 200,
//!             headers: Default::default(),
//!             body: self.0.into(),
//!         })
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod log;

pub use error::BridgeError;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
