//! Configuration loading and parsing.
//!
//! One YAML document selects the execution backend for the whole process
//! and carries the grid options:
//!
//! ```yaml
//! backend: grid
//! grid:
//!   nodes: "1:ppn=8:gpus=1"
//!   stdout_dir: /var/spool/gridrun/out
//!   stderr_dir: /var/spool/gridrun/err
//!   abort_grace_ms: 2000
//! ```

mod error;

pub use error::ConfigError;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::execution::BackendKind;
use crate::grid::GridConfig;

/// Raw YAML shape; the backend name is validated into a [`BackendKind`]
/// when the document is loaded.
#[derive(Debug, Serialize, Deserialize)]
struct RawConfig {
    #[serde(default = "default_backend_name")]
    backend: String,
    #[serde(default)]
    grid: GridConfig,
}

fn default_backend_name() -> String {
    "local".to_string()
}

/// Process-wide execution configuration, selected once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which execution strategy tasks use.
    pub backend: BackendKind,
    /// Scheduler options; only consulted by the grid backend.
    pub grid: GridConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            grid: GridConfig::default(),
        }
    }
}

impl Config {
    /// Parse a configuration document.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(contents)?;
        Ok(Self {
            backend: raw.backend.parse()?,
            grid: raw.grid,
        })
    }

    /// Load a configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml_str(&contents)
    }
}
