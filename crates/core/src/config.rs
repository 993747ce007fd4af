use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{plain_serialization_error, toml_deserialize_error, VnError, VnResult};
use crate::format::FormatOptions;
use crate::runtime::RuntimeOptions;

/// Default byte budget for cached media files.
pub const DEFAULT_CACHE_BUDGET: usize = 64 * 1024 * 1024;

/// Everything a tool needs to parse, dump and play scripts.
///
/// Every section is optional in TOML; missing keys take their defaults.
///
/// ```toml
/// [runtime]
/// game = "never7"
/// seed = 7
///
/// [runtime.parse]
/// alignment_heuristic = false
///
/// [format]
/// token_frequency = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub runtime: RuntimeOptions,
    pub format: FormatOptions,
    pub media: MediaLimits,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaLimits {
    pub cache_budget: usize,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            cache_budget: DEFAULT_CACHE_BUDGET,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    #[diagnostic(
        code("sc3.config.not_found"),
        help("pass an existing file or drop the --config flag")
    )]
    NotFound(PathBuf),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(VnError),

    #[error("io error: {0}")]
    #[diagnostic(code("sc3.config.io"))]
    Io(#[from] std::io::Error),
}

impl EngineConfig {
    pub fn from_toml_str(input: &str) -> VnResult<Self> {
        toml::from_str(input).map_err(|err| toml_deserialize_error(input, &err))
    }

    pub fn to_toml_string(&self) -> VnResult<String> {
        toml::to_string_pretty(self).map_err(plain_serialization_error)
    }

    /// Loads a config file from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(ConfigError::Parse)?;
        tracing::info!(path = %path.display(), game = %config.runtime.game, "loaded config");
        Ok(config)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
