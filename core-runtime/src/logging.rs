//! `tracing` setup for the sync core.
//!
//! [`init_logging`] installs a `tracing-subscriber` registry writing to
//! stderr in one of three formats. If the host hands over a [`LoggerSink`],
//! every event that passes the filter is also mirrored there, with Subsonic
//! credential parameters (`p`, `t`, `s`) redacted on the way out.
//!
//! ```ignore
//! use bridge_traits::log::{ConsoleLogger, LogLevel};
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use std::sync::Arc;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug)
//!         .with_logger_sink(Arc::new(ConsoleLogger::default())),
//! )?;
//! ```

use crate::error::{Error, Result};

use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Crates whose events are emitted at the configured level by default.
const WORKSPACE_TARGETS: &[&str] = &[
    "core_runtime",
    "core_library",
    "core_sync",
    "core_service",
    "provider_subsonic",
    "bridge_desktop",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, coloured; the debug-build default
    Pretty,
    /// One flattened JSON object per event; the release default
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to workspace crates when `filter` is unset
    pub level: LogLevel,
    /// Full `EnvFilter` directive, e.g. `"provider_subsonic=debug,core_sync=trace"`
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span open/close, and span context in JSON output
    pub enable_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("enable_spans", &self.enable_spans)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Overrides the per-crate defaults entirely.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }
}

/// Installs the global subscriber.
///
/// Fails with [`Error::Config`] when a subscriber is already installed or
/// the filter directive does not parse.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let sink_layer = LoggerSinkLayer::new(config.logger_sink.clone());
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let output = tracing_subscriber::fmt::layer().with_writer(io::stderr);
    let output = match config.format {
        LogFormat::Pretty => output.pretty().with_span_events(span_events).boxed(),
        LogFormat::Compact => output.compact().with_span_events(span_events).boxed(),
        LogFormat::Json => output
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .boxed(),
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(sink_layer)
        .with(output)
        .try_init();

    result.map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = match &config.filter {
        Some(custom_filter) => custom_filter.clone(),
        None => {
            // Our crates at the configured level, dependencies at warn
            let base_level = config.level.as_str();
            let mut directives: Vec<String> = WORKSPACE_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, base_level))
                .collect();
            directives.push("h2=warn".to_string());
            directives.push("hyper=warn".to_string());
            directives.push("reqwest=warn".to_string());
            directives.push("warn".to_string());
            directives.join(",")
        }
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

/// Mirrors filtered events into the host's [`LoggerSink`].
struct LoggerSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl LoggerSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let level = match *event.metadata().level() {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        };
        if level < sink.min_level() {
            return;
        }

        let mut collected = RedactingFields::default();
        event.record(&mut collected);
        let message = collected
            .message
            .take()
            .unwrap_or_else(|| event.metadata().name().to_string());

        let mut entry = LogEntry::new(level, event.metadata().target(), message);
        entry.fields = collected.fields;
        entry.span_id = ctx.lookup_current().map(|span| span.name().to_string());

        deliver(Arc::clone(sink), entry);
    }
}

/// Hands the entry to the sink without blocking a runtime worker.
fn deliver(sink: Arc<dyn LoggerSink>, entry: LogEntry) {
    let send = async move {
        if let Err(err) = sink.log(entry).await {
            eprintln!("LoggerSink error: {}", err);
        }
    };

    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(send);
        }
        Err(_) => futures::executor::block_on(send),
    }
}

/// Event fields with credential values already masked.
#[derive(Default)]
struct RedactingFields {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl Visit for RedactingFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            name => {
                self.fields
                    .insert(name.to_string(), redact_if_sensitive(name, value));
            }
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_str(field, &value.to_string());
    }

    // Numbers and bools arrive here through the default forwarding.
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Redacts the value of credential-bearing fields.
///
/// Covers the Subsonic authentication parameters (`p`, `t`, `s`) as well as
/// the usual long-form names:
///
/// ```ignore
/// use core_runtime::logging::redact_if_sensitive;
///
/// tracing::debug!(t = %redact_if_sensitive("t", token), "Built credential");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE_FIELDS: &[&str] = &["token", "password", "pass", "salt", "secret"];
    const SENSITIVE_PARAMS: &[&str] = &["p", "t", "s"];

    let field_lower = field_name.to_lowercase();
    if SENSITIVE_PARAMS.contains(&field_lower.as_str())
        || SENSITIVE_FIELDS.iter().any(|&f| field_lower.contains(f))
    {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

/// Renders query pairs for a log line with credentials redacted.
pub fn redact_query<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, redact_if_sensitive(key, value)))
        .collect::<Vec<_>>()
        .join("&")
}
