//! # Node Logging
//!
//! One `tracing` subscriber per process, writing to stderr. `version` and
//! `init` print their reports on stdout, so the two streams never mix.
//!
//! Contract code logs asset ids, partitions and hash prefixes. Appraised
//! values and transient payloads are never passed to a log macro, so both
//! formats are safe to ship to a shared aggregator.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used by `run` when `RUST_LOG` is unset.
pub const RUN_FILTER: &str =
    "cloister_node=info,cloister_contracts=info,cloister_protocol=info,tower_http=info";

/// Filter used by `init`, which only reports what it wrote.
pub const INIT_FILTER: &str = "cloister_node=info";

/// Selected with `--log-format` or `CLOISTER_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Colored, with source locations.
    Pretty,
    /// One flat JSON object per event.
    Json,
}

/// `RUST_LOG` if it parses, else `fallback`, else plain `info`.
fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(fallback: &str, format: LogFormat) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(filter(fallback));
    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()?,
    }

    tracing::debug!(?format, "logging initialized");
    Ok(())
}
