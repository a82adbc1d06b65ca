//! Logging setup for thread-inbox.
//!
//! Uses `tracing` with `tracing-subscriber`. Logs go to stderr so the
//! rendered list on stdout stays clean.
//!
//! ## Environment Variables
//!
//! - `THREAD_INBOX_LOG` or `RUST_LOG`: filter directive (e.g. `thread_inbox=debug,reqwest=warn`)
//! - `THREAD_INBOX_LOG_FORMAT`: output format (`pretty`, `compact`, `json`)
//!
//! ```bash
//! # Watch page requests and discarded responses
//! THREAD_INBOX_LOG=thread_inbox=debug thread-inbox --watch list
//! ```

use strum::EnumString;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

const DEFAULT_FILTER: &str = "thread_inbox=warn";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse a format name; unknown names fall back to compact.
    pub fn parse_or_default(s: &str) -> Self {
        s.trim().parse().unwrap_or_default()
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive (e.g. "debug", "thread_inbox=debug,warn")
    pub filter: String,
    pub format: LogFormat,
    /// Emit span open/close events
    pub with_spans: bool,
    /// Include file/line in logs
    pub with_file: bool,
    /// Colored output
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
            with_spans: false,
            with_file: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let filter = lookup("THREAD_INBOX_LOG")
            .or_else(|| lookup("RUST_LOG"))
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        let format = lookup("THREAD_INBOX_LOG_FORMAT")
            .map(|s| LogFormat::parse_or_default(&s))
            .unwrap_or_default();

        Self {
            filter,
            format,
            ..Default::default()
        }
    }

    /// Debug-level logs for this crate, spans included.
    pub fn verbose(mut self) -> Self {
        self.filter = "thread_inbox=debug,info".to_string();
        self.with_spans = true;
        self.with_file = true;
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: LogConfig) {
    let env_filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let span_events = if config.with_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .with_ansi(config.ansi);

    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = match config.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(layer.json().with_ansi(false)))
        }
        LogFormat::Compact => tracing::subscriber::set_global_default(registry.with(layer.compact())),
        LogFormat::Pretty => tracing::subscriber::set_global_default(registry.with(layer.pretty())),
    };
}

pub fn init_from_env() {
    init(LogConfig::from_env());
}
