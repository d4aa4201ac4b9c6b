//! Tracing subscriber for the `cv` binary.
//!
//! The library crates log through the `log` facade. The subscriber installs
//! the `tracing-log` bridge, so their records reach the same stderr layer.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Warnings and errors by default, down to debug with `--verbose`.
/// `RUST_LOG` overrides both.
pub(crate) fn init(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact();

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!("Logging initialized");
    }
}
