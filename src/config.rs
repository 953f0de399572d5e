//! Engine configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Limits and write behavior shared by the query engine and stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting of sub-queries
    pub max_query_depth: usize,
    /// Maximum relationship hops a path or expression may follow
    pub max_path_depth: usize,
    /// In-memory store: queue writers on a gate and stage each mutation under a
    /// read lock. When off, mutations are staged under the write lock.
    pub serialize_writes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_query_depth: 16,
            max_path_depth: 8,
            serialize_writes: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(source: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_yaml_str(source: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(source)?)
    }
}
