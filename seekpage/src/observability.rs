//! Tracing setup

use tracing_subscriber::EnvFilter;

use crate::config::PagerConfig;

/// Install a JSON `tracing` subscriber filtered by `config.log_level`
///
/// `RUST_LOG` is not consulted; an unparsable level falls back to `info`.
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(config: &PagerConfig) -> bool {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Tracing initialized for: {}", config.name);
    }
    installed
}
