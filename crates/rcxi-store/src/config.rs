//! TOML session configuration and data directory resolution.
//!
//! ```toml
//! seed = 42
//!
//! [engine]
//! dimension = 64
//! contractionRatio = 0.9
//!
//! [graph]
//! nodeCount = 16
//! topology = { kind = "nearestNeighbor", k = 3 }
//! ```
//!
//! Missing keys take their defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rcxi_core::{EngineConfig, GraphConfig};

use crate::error::Result;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RCXI_DATA_DIR";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub engine: EngineConfig,
    pub graph: GraphConfig,
    /// Engine RNG seed. `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "session config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.graph.validate()?;
        Ok(())
    }
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// `$RCXI_DATA_DIR` if set and non-empty, otherwise `~/.rcxi`.
pub fn default_data_dir() -> PathBuf {
    match env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs_home().join(".rcxi"),
    }
}
