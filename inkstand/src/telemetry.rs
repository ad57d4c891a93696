//! Tracing initialization (fmt subscriber + `RUST_LOG`-style filtering).
//!
//! The gateway logs structured events via `tracing`. Verbosity is controlled
//! through the standard `RUST_LOG` environment variable; when unset, the
//! subscriber defaults to `info`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Safe to call once per process; returns an error if a subscriber is already
/// installed (which is why tests use `test-log` instead of calling this).
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
