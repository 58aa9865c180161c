//! Where agent policies live.

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use {
    async_trait::async_trait,
    tracing::{debug, info},
};

use crate::{
    Error, PolicyUpdate, Result, ToolCatalog, ToolPolicy,
    error::Context,
};

/// File name of an agent's policy inside its directory.
pub const TOOLS_CONFIG_FILE: &str = "tools.json";

/// Persistent storage for agent tool policies.
///
/// The authorizer only trusts [`PolicyStore::modified_at`] to decide whether
/// a cached policy is stale; content is never compared.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Directory holding one sub-directory per agent.
    fn root(&self) -> &Path;

    /// Point the store at a different agents directory.
    fn set_root(&mut self, root: PathBuf);

    /// Location of the agent's policy file.
    fn tools_config_path(&self, agent_id: &str) -> Result<PathBuf> {
        validate_agent_id(agent_id)?;
        Ok(self.root().join(agent_id).join(TOOLS_CONFIG_FILE))
    }

    /// Modification time of the agent's policy file. Any failure to read it,
    /// including a missing file, is `None`.
    async fn modified_at(&self, agent_id: &str) -> Option<SystemTime> {
        let path = self.tools_config_path(agent_id).ok()?;
        match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(modified) => Some(modified),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "policy file has no readable mtime");
                None
            },
        }
    }

    /// Load and validate the agent's policy.
    async fn load(&self, agent_id: &str, catalog: &ToolCatalog) -> Result<ToolPolicy>;

    /// Validate `update`, merge it into the current policy and persist the
    /// result.
    async fn update(
        &self,
        agent_id: &str,
        update: PolicyUpdate,
        catalog: &ToolCatalog,
    ) -> Result<ToolPolicy>;
}

/// Agent ids become directory names, so anything that could escape the root
/// is refused.
fn validate_agent_id(agent_id: &str) -> Result<()> {
    let bad = agent_id.is_empty()
        || agent_id == "."
        || agent_id == ".."
        || agent_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(Error::invalid_agent_id(agent_id));
    }
    Ok(())
}

/// Policies as `<root>/<agent_id>/tools.json`.
///
/// A missing file means the default policy.
#[derive(Debug, Clone)]
pub struct FilePolicyStore {
    root: PathBuf,
}

impl FilePolicyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn read_policy(&self, path: &Path, catalog: &ToolCatalog) -> Result<ToolPolicy> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no policy file, using default policy");
                return Ok(ToolPolicy::default());
            },
            Err(e) => return Err(e.into()),
        };
        let policy: ToolPolicy = serde_json::from_str(&raw)
            .with_context(|| format!("parse policy {}", path.display()))?;
        policy.validate(catalog)?;
        Ok(policy)
    }
}

#[async_trait]
impl PolicyStore for FilePolicyStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn set_root(&mut self, root: PathBuf) {
        self.root = root;
    }

    async fn load(&self, agent_id: &str, catalog: &ToolCatalog) -> Result<ToolPolicy> {
        let path = self.tools_config_path(agent_id)?;
        self.read_policy(&path, catalog).await
    }

    async fn update(
        &self,
        agent_id: &str,
        update: PolicyUpdate,
        catalog: &ToolCatalog,
    ) -> Result<ToolPolicy> {
        let path = self.tools_config_path(agent_id)?;
        update.validate(catalog)?;

        let mut policy = self.read_policy(&path, catalog).await?;
        policy.apply(update);
        policy.validate(catalog)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(&policy)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;

        info!(agent_id, path = %path.display(), "tool policy saved");
        Ok(policy)
    }
}
