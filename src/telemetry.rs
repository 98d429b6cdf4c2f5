//! Logging setup for processes embedding the adaptive eviction loop.

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber. `RUST_LOG` overrides the default filter.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(verbose: bool) -> bool {
    let filter = if verbose {
        "adaptive_block_cache=debug"
    } else {
        "adaptive_block_cache=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Like [`init_tracing`], emitting one JSON object per event.
pub fn init_json_tracing(verbose: bool) -> bool {
    let filter = if verbose {
        "adaptive_block_cache=debug"
    } else {
        "adaptive_block_cache=info"
    };

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .try_init()
        .is_ok()
}
