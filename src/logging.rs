//! Logging setup for hosts embedding the provider.
//!
//! Output goes to **stderr**; the host owns stdout. Filtering follows
//! `RUST_LOG`, e.g. `RUST_LOG=signalform_provider=debug` to see the
//! credential chain and every request status.
//!
//! ```ignore
//! signalform_provider::init_logging();
//! tracing::info!("provider starting");
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter_or(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Install the global subscriber at `info` unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with a caller-chosen default level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter_or(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to install the subscriber, returning `false` if one is already set.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter_or("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}
