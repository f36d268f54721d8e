//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the Subsonic sync core:
//! - Logging and tracing infrastructure
//! - Configuration management for the remote server connection
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the core runtime utilities that other modules depend on.
//! It establishes the logging conventions, configuration validation, and event
//! broadcasting mechanisms used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{SubsonicConfig, SubsonicConfigBuilder};
pub use error::{Error, Result};
