//! # replykit-telemetry
//!
//! Logging setup for replykit binaries.
//!
//! - [`init_telemetry`] installs a `tracing` subscriber with an `EnvFilter`
//!   (`RUST_LOG`, default `info`) and pretty or JSON output.
//! - [`init_with_recorder`] additionally captures request-scoped spans into a
//!   [`RequestTraceStore`] for the debug trace endpoint.

pub mod memory;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

pub use memory::{
    DEFAULT_TRACE_CAPACITY, REQUEST_ID_FIELD, RequestTraceLayer, RequestTraceStore, SpanRecord,
};

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected 'pretty' or 'json')")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn install(format: LogFormat, recorder: Option<RequestTraceLayer>) -> Result<(), TryInitError> {
    let fmt_layer = match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };
    tracing_subscriber::registry().with(fmt_layer).with(recorder).with(env_filter()).try_init()
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_telemetry(format: LogFormat) -> Result<(), TryInitError> {
    install(format, None)
}

/// Install the global subscriber and record request spans into `store`.
pub fn init_with_recorder(
    format: LogFormat,
    store: Arc<RequestTraceStore>,
) -> Result<(), TryInitError> {
    install(format, Some(RequestTraceLayer::new(store)))
}
