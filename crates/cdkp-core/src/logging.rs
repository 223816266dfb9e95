//! Log output setup
//!
//! The library only emits `tracing` events. Binaries and tests that want to
//! see them call [`init_logging`] once, usually with the `logging` section of
//! their [`PipelineConfig`](crate::config::PipelineConfig).

use crate::config::LoggingConfig;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install a global subscriber; later calls are no-ops
///
/// `RUST_LOG` takes precedence over `config.filter`. An already-installed
/// global subscriber is left in place.
pub fn init_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.filter));

        let result = if config.json {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .try_init()
        } else {
            fmt().with_env_filter(filter).with_target(true).try_init()
        };

        if result.is_err() {
            tracing::debug!("global subscriber already installed");
        }
    });
}

/// True once [`init_logging`] has run
#[must_use]
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}
