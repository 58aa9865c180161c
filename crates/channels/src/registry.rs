use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{Error, Result, error::Context};

/// How a plugin expects to receive outbound messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMode {
    InProcess,
    #[default]
    OutOfProcess,
}

/// A plugin known to the external registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRecord {
    pub id: String,
    pub base_url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub delivery_mode: DeliveryMode,
    #[serde(default)]
    pub channel_ids: BTreeSet<String>,
}

fn default_enabled() -> bool {
    true
}

impl PluginRecord {
    /// Whether this record can take an HTTP delivery for `channel_id`.
    pub fn accepts(&self, channel_id: &str) -> bool {
        self.enabled
            && self.delivery_mode != DeliveryMode::InProcess
            && self.channel_ids.contains(channel_id)
    }
}

/// Source of out-of-process plugin records.
///
/// Consulted on every routing miss; implementations return a fresh
/// snapshot each call.
#[async_trait]
pub trait PluginRegistry: Send + Sync {
    async fn list_channel_plugins(&self) -> Result<Vec<PluginRecord>>;
}

/// Registry over a fixed list of records.
#[derive(Debug, Clone, Default)]
pub struct StaticPluginRegistry {
    records: Vec<PluginRecord>,
}

impl StaticPluginRegistry {
    pub fn new(records: Vec<PluginRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl PluginRegistry for StaticPluginRegistry {
    async fn list_channel_plugins(&self) -> Result<Vec<PluginRecord>> {
        Ok(self.records.clone())
    }
}

/// Registry backed by a JSON array of [`PluginRecord`]s on disk.
///
/// The file is re-read on every call so edits take effect without a
/// restart. A missing file is an empty registry.
#[derive(Debug, Clone)]
pub struct FilePluginRegistry {
    path: PathBuf,
}

impl FilePluginRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PluginRegistry for FilePluginRegistry {
    async fn list_channel_plugins(&self) -> Result<Vec<PluginRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "plugin registry file not found");
                return Ok(Vec::new());
            },
            Err(e) => {
                return Err(Error::Message(format!(
                    "read plugin registry {}: {e}",
                    self.path.display()
                )));
            },
        };
        serde_json::from_str(&raw)
            .with_context(|| format!("parse plugin registry {}", self.path.display()))
    }
}
