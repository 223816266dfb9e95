//! Pipeline configuration
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reject deployments added through a group handle once the pipeline is built
    pub seal_groups_on_build: bool,
    /// Options for the default backend
    pub backend: BackendConfig,
    /// Log output options
    ///
    /// Not applied by the pipeline itself; call [`PipelineConfig::init_logging`]
    /// (or [`crate::logging::init_logging`]) from the binary or test.
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, PipelineError> {
        Ok(toml::from_str(source)?)
    }

    /// With group sealing on or off
    #[inline]
    #[must_use]
    pub fn with_sealed_groups(mut self, sealed: bool) -> Self {
        self.seal_groups_on_build = sealed;
        self
    }

    /// With default backend options
    #[inline]
    #[must_use]
    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// With log output options
    #[inline]
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Install the global subscriber described by `logging`
    pub fn init_logging(&self) {
        crate::logging::init_logging(&self.logging);
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seal_groups_on_build: true,
            backend: BackendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Default backend options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Omit an empty source stage instead of rejecting the plan
    pub allow_empty_source_stage: bool,
    /// Reject sibling nodes that share a name
    pub reject_duplicate_names: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            allow_empty_source_stage: true,
            reject_duplicate_names: true,
        }
    }
}

/// Log output options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}
