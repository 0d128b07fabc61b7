//! Logging initialization for embedding applications.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the embedder, and these helpers cover the common setups.

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::{MakeWriter, fmt};
use tracing_subscriber::util::SubscriberInitExt;

/// Initializes compact human-readable logging to stderr.
pub fn init_logging(env_filter: &str) {
    fmt()
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
        .init();
}

/// Initializes JSON logging for deployments that ship structured logs.
pub fn init_json_logging<W>(env_filter: &str, make_writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    fmt()
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_env_filter(env_filter)
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_writer(make_writer)
        .finish()
        .init();
}
