//! # Repository Pattern Implementation
//!
//! The sync core reaches the host library only through [`TrackRepository`]:
//! it selects tracks with a [`TrackQuery`](crate::query::TrackQuery) and
//! stores resolved identifiers with `update`.
//!
//! ## Available Repositories
//!
//! - `InMemoryTrackRepository` - lock-protected vector of tracks

pub mod track;

pub use track::{InMemoryTrackRepository, TrackRepository};
