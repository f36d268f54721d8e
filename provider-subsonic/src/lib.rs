//! # Subsonic Provider
//!
//! Client for servers speaking the Subsonic REST protocol (Subsonic,
//! Airsonic, Navidrome, Gonic, ...).
//!
//! ## Overview
//!
//! This module provides:
//! - Per-request credentials in token (`md5(password + salt)`) or
//!   hex-encoded password mode
//! - A transport that decodes the `subsonic-response` envelope and
//!   classifies failures
//! - The identity resolver: a cascade of `search3` strategies with exact
//!   and lenient title matching and an album-scoped fallback
//! - Translation of local rating fields to the remote 0-5 scale

pub mod auth;
pub mod client;
pub mod error;
pub mod matcher;
pub mod rating;
pub mod types;

pub use auth::{AuthMode, Authenticator, Credential};
pub use client::SubsonicClient;
pub use error::{AuthError, Result, SubsonicError, TransportError, TransportResult};
pub use matcher::{MatchMethod, Matcher, Resolution, SearchStrategy};
pub use rating::{translate, RatingScale};
pub use types::{Envelope, RemoteAlbum, RemoteAlbumDetail, RemoteSong, ScanStatus};
