//! Config schema types.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PorticoConfig {
    pub delivery: DeliveryConfig,
    pub policy: PolicyConfig,
    pub metrics: MetricsConfig,
}

/// Outbound channel delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Per-request timeout for HTTP delivery to out-of-process plugins.
    pub timeout_secs: u64,
    /// JSON file listing out-of-process plugin records. Absent means no
    /// out-of-process plugins are known.
    pub registry_path: Option<PathBuf>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            registry_path: None,
        }
    }
}

/// Tool authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Directory holding one sub-directory per agent. Defaults to
    /// `<data dir>/agents`.
    pub agents_root: Option<PathBuf>,
    /// Known tool ids. Empty means the built-in catalog.
    pub known_tools: Vec<String>,
}

impl PolicyConfig {
    /// The configured agents root, or `<data dir>/agents`.
    pub fn resolved_agents_root(&self) -> PathBuf {
        self.agents_root
            .clone()
            .unwrap_or_else(|| crate::data_dir().join("agents"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub enabled: bool,
}
