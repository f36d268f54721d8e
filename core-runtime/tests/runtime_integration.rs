//! Integration tests for logging initialisation and configuration loading

use bridge_traits::log::{ConsoleLogger, LogLevel};
use core_runtime::config::SubsonicConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::Arc;

#[test]
fn test_logging_initializes_once() {
    // The global subscriber can only be installed once per process
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(Arc::new(ConsoleLogger::default()));

    assert!(init_logging(config.clone()).is_ok());
    tracing::info!(target: "core_sync", "Logging ready");

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_invalid_filter_is_rejected() {
    let config = LoggingConfig::default().with_filter("core_sync=notalevel");
    assert!(matches!(init_logging(config), Err(Error::Config(_))));
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

#[test]
fn test_config_document_round_trip_through_validation() {
    let config = SubsonicConfig::from_json(
        r#"{
            "user": "alice",
            "pass": "sesame",
            "url": "https://music.example.org/navidrome/",
            "auth": "password",
            "auto_scan": false,
            "max_concurrent": 4
        }"#,
    )
    .unwrap();

    assert_eq!(config.auth, "password");
    assert!(!config.auto_scan);
    assert_eq!(config.max_concurrent, 4);
    assert_eq!(
        config.endpoint_url("getScanStatus"),
        "https://music.example.org/navidrome/rest/getScanStatus"
    );
}

#[test]
fn test_config_document_rejects_invalid_width() {
    let err = SubsonicConfig::from_json(r#"{"max_concurrent": 0}"#).unwrap_err();
    assert!(err.to_string().contains("max_concurrent"));
}
