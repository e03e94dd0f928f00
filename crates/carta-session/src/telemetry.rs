//! Tracing setup for binaries embedding the engine.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,carta=debug";

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
///
/// ## Filter Examples
/// - `RUST_LOG=debug` - Everything at debug
/// - `RUST_LOG=carta_session=trace` - Trace for the engine crate only
/// - Default: `info,carta=debug`
///
/// Does nothing if the host already installed a global subscriber.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
