//! Renderer Configuration
//!
//! Every field has a default, so an empty JSON object is a complete config.

use serde::{Deserialize, Serialize};

/// Top-level configuration for a root and its scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root: RootConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// Type name recorded on the container work node.
    pub container_tag: String,
    /// Fail a render on hook-order mismatches instead of repairing the slot
    /// list with a warning.
    pub strict_hooks: bool,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            container_tag: "#root".to_string(),
            strict_hooks: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Yield back to the host after this many tasks in one flush.
    /// `None` runs until the queue is empty.
    pub max_tasks_per_flush: Option<usize>,
}
