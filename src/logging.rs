// Copyright © 2014, Peter Atashian

//! Logging goes to stderr so stdout only carries the per-page progress lines.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn,mwexport=info";

/// Installs a stderr subscriber filtered by `RUST_LOG`, falling back to
/// `DEFAULT_FILTER`. Does nothing if a subscriber is already set.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
