//! # Library Collaborator Module
//!
//! The host music library as seen by the sync core.
//!
//! ## Overview
//!
//! This module provides:
//! - The `Track` model: the local metadata the resolver reads and the remote
//!   identifier it writes back
//! - `TrackQuery`, a small `field:value` filter language for selecting tracks
//! - The `TrackRepository` trait through which tracks are iterated and stored
//! - `InMemoryTrackRepository`, a thread-safe repository for hosts without
//!   their own store and for tests

pub mod error;
pub mod models;
pub mod query;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::Track;
pub use query::TrackQuery;
pub use repositories::{InMemoryTrackRepository, TrackRepository};
