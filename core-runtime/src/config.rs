//! # Core Configuration Module
//!
//! Provides configuration management for the Subsonic sync core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`SubsonicConfig`] that holds the remote server location, the credentials
//! and the tuning knobs for batch operations. It enforces fail-fast
//! validation so that a bad URL or an absurd worker width is reported before
//! any request is issued.
//!
//! `SubsonicConfig` is also `serde`-deserialisable so hosts can load it from
//! their own configuration files. Missing keys fall back to the defaults
//! below.
//!
//! | key            | default                 |
//! |----------------|-------------------------|
//! | `user`         | `admin`                 |
//! | `pass`         | `admin`                 |
//! | `url`          | `http://localhost:4040` |
//! | `auth`         | `token`                 |
//! | `auto_scan`    | `true`                  |
//! | `max_concurrent` | `3`                   |
//! | `timeout_secs` | `5`                     |
//! | `client_name`  | `subsonic-sync`         |
//!
//! The legacy `host`, `port` and `contextpath` keys are honoured when `url`
//! is empty.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SubsonicConfig;
//!
//! let config = SubsonicConfig::builder()
//!     .url("http://music.local:4533/")
//!     .user("alice")
//!     .password("sesame")
//!     .auth_mode("token")
//!     .build()?;
//!
//! assert_eq!(config.endpoint_url("ping"), "http://music.local:4533/rest/ping");
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";
pub const DEFAULT_URL: &str = "http://localhost:4040";
pub const DEFAULT_AUTH_MODE: &str = "token";
pub const DEFAULT_MAX_CONCURRENT: usize = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CLIENT_NAME: &str = "subsonic-sync";

const DEFAULT_LEGACY_HOST: &str = "localhost";
const DEFAULT_LEGACY_PORT: u16 = 4040;

const MAX_CONCURRENT_LIMIT: usize = 32;
const MAX_TIMEOUT_SECS: u64 = 300;

/// Connection and batch settings for a Subsonic-compatible server.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubsonicConfig {
    /// Account name sent as `u` on every request
    pub user: String,

    /// Account password; only ever sent hashed (token mode) or hex-encoded
    #[serde(rename = "pass")]
    pub password: String,

    /// Base URL of the server, without the `/rest` suffix
    pub url: String,

    /// Authentication mode (`token` or `password`)
    ///
    /// Kept as text: the authenticator rejects unknown modes when it builds
    /// a credential, which is where hosts expect the failure to surface.
    pub auth: String,

    /// Trigger a rescan at shutdown when the library changed
    pub auto_scan: bool,

    /// Worker pool width for batch operations
    pub max_concurrent: usize,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Client identifier sent as `c`
    pub client_name: String,

    /// Legacy server host, used only when `url` is empty
    pub host: Option<String>,

    /// Legacy server port, used only when `url` is empty
    pub port: Option<u16>,

    /// Legacy context path, used only when `url` is empty
    #[serde(rename = "contextpath")]
    pub context_path: Option<String>,
}

impl Default for SubsonicConfig {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            url: DEFAULT_URL.to_string(),
            auth: DEFAULT_AUTH_MODE.to_string(),
            auto_scan: true,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            host: None,
            port: None,
            context_path: None,
        }
    }
}

impl fmt::Debug for SubsonicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsonicConfig")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("url", &self.url)
            .field("auth", &self.auth)
            .field("auto_scan", &self.auto_scan)
            .field("max_concurrent", &self.max_concurrent)
            .field("timeout_secs", &self.timeout_secs)
            .field("client_name", &self.client_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("context_path", &self.context_path)
            .finish()
    }
}

impl SubsonicConfig {
    /// Creates a new builder for constructing a `SubsonicConfig`.
    pub fn builder() -> SubsonicConfigBuilder {
        SubsonicConfigBuilder::default()
    }

    /// Parses a JSON document and validates the result.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid configuration document: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Base URL of the server with any trailing `/` removed.
    ///
    /// Falls back to `http://{host}:{port}{contextpath}` when `url` is empty.
    pub fn base_url(&self) -> String {
        let url = self.url.trim();
        if !url.is_empty() {
            return url.trim_end_matches('/').to_string();
        }

        let host = self.host.as_deref().unwrap_or(DEFAULT_LEGACY_HOST);
        let port = self.port.unwrap_or(DEFAULT_LEGACY_PORT);
        let context_path = match self.context_path.as_deref() {
            None | Some("/") => "",
            Some(path) => path.trim_end_matches('/'),
        };

        format!("http://{}:{}{}", host, port, context_path)
    }

    /// Full URL of a REST endpoint, e.g. `<base>/rest/search3`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/rest/{}", self.base_url(), endpoint)
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The user name is not empty
    /// - The base URL parses as an absolute http(s) URL
    /// - The worker width is between 1 and 32
    /// - The request timeout is between 1 and 300 seconds
    pub fn validate(&self) -> Result<()> {
        if self.user.trim().is_empty() {
            return Err(Error::Config("User name cannot be empty".to_string()));
        }

        let base = self.base_url();
        let parsed = Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid server URL '{}': {}", base, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Config(format!(
                "Server URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none() {
            return Err(Error::Config(format!(
                "Server URL '{}' has no host",
                base
            )));
        }

        if self.max_concurrent == 0 {
            return Err(Error::Config(
                "max_concurrent must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent > MAX_CONCURRENT_LIMIT {
            return Err(Error::Config(format!(
                "max_concurrent exceeds maximum of {}",
                MAX_CONCURRENT_LIMIT
            )));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(Error::Config(format!(
                "timeout_secs exceeds maximum of {} seconds",
                MAX_TIMEOUT_SECS
            )));
        }

        Ok(())
    }
}

/// Builder for constructing [`SubsonicConfig`] instances.
///
/// Unset values keep their defaults; [`build()`](SubsonicConfigBuilder::build)
/// validates the result.
#[derive(Default)]
pub struct SubsonicConfigBuilder {
    config: SubsonicConfig,
}

impl SubsonicConfigBuilder {
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Sets the authentication mode (`token` or `password`).
    pub fn auth_mode(mut self, mode: impl Into<String>) -> Self {
        self.config.auth = mode.into();
        self
    }

    pub fn auto_scan(mut self, enabled: bool) -> Self {
        self.config.auto_scan = enabled;
        self
    }

    pub fn max_concurrent(mut self, width: usize) -> Self {
        self.config.max_concurrent = width;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    /// Sets the legacy `host`/`port`/`contextpath` triple and clears `url`.
    pub fn legacy_location(
        mut self,
        host: impl Into<String>,
        port: u16,
        context_path: impl Into<String>,
    ) -> Self {
        self.config.url = String::new();
        self.config.host = Some(host.into());
        self.config.port = Some(port);
        self.config.context_path = Some(context_path.into());
        self
    }

    /// Builds the final [`SubsonicConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when validation fails.
    pub fn build(self) -> Result<SubsonicConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SubsonicConfig::default();
        assert_eq!(config.user, "admin");
        assert_eq!(config.password, "admin");
        assert_eq!(config.auth, "token");
        assert!(config.auto_scan);
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.base_url(), "http://localhost:4040");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let config = SubsonicConfig::builder()
            .url("http://music.local:4533/")
            .build()
            .unwrap();

        assert_eq!(config.base_url(), "http://music.local:4533");
        assert_eq!(
            config.endpoint_url("search3"),
            "http://music.local:4533/rest/search3"
        );
    }

    #[test]
    fn test_legacy_location() {
        let config = SubsonicConfig::builder()
            .legacy_location("nas", 8080, "/airsonic")
            .build()
            .unwrap();
        assert_eq!(config.base_url(), "http://nas:8080/airsonic");

        let root = SubsonicConfig::builder()
            .legacy_location("nas", 8080, "/")
            .build()
            .unwrap();
        assert_eq!(root.endpoint_url("ping"), "http://nas:8080/rest/ping");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = SubsonicConfig::builder().user("  ").build().unwrap_err();
        assert!(err.to_string().contains("User name"));

        assert!(SubsonicConfig::builder().url("ftp://host").build().is_err());
        assert!(SubsonicConfig::builder().url("not a url").build().is_err());
        assert!(SubsonicConfig::builder().max_concurrent(0).build().is_err());
        assert!(SubsonicConfig::builder().max_concurrent(33).build().is_err());
        assert!(SubsonicConfig::builder().timeout_secs(0).build().is_err());
        assert!(SubsonicConfig::builder().timeout_secs(301).build().is_err());
    }

    #[test]
    fn test_unknown_auth_mode_is_not_a_config_error() {
        let config = SubsonicConfig::builder().auth_mode("kerberos").build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_from_json_applies_defaults_and_renames() {
        let config = SubsonicConfig::from_json(
            r#"{"user": "alice", "pass": "sesame", "url": "", "host": "box", "port": 4533, "contextpath": "/"}"#,
        )
        .unwrap();

        assert_eq!(config.user, "alice");
        assert_eq!(config.password, "sesame");
        assert_eq!(config.auth, "token");
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.base_url(), "http://box:4533");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = SubsonicConfig::builder().password("hunter2").build().unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
