//! Per-agent tool policy as stored on disk (camelCase JSON).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, ToolCatalog};

/// What happens to a tool without an explicit override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultPolicy {
    #[default]
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Guardrails {
    pub max_tool_calls_per_minute: u32,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            max_tool_calls_per_minute: 60,
        }
    }
}

/// Which tools an agent may call and how often.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolPolicy {
    pub default_policy: DefaultPolicy,
    /// Explicit per-tool overrides; absent tools fall back to
    /// `default_policy`.
    pub tools: BTreeMap<String, bool>,
    pub guardrails: Guardrails,
}

impl ToolPolicy {
    /// Override if present, otherwise the default policy.
    pub fn allows(&self, tool_id: &str) -> bool {
        self.tools
            .get(tool_id)
            .copied()
            .unwrap_or(self.default_policy == DefaultPolicy::Allow)
    }

    /// Every override must name a known tool and the rate guardrail must
    /// admit at least one call.
    pub fn validate(&self, catalog: &ToolCatalog) -> Result<()> {
        if let Some(tool_id) = self.tools.keys().find(|t| !catalog.contains(t)) {
            return Err(Error::unknown_tool(tool_id.as_str()));
        }
        if self.guardrails.max_tool_calls_per_minute == 0 {
            return Err(Error::invalid_policy(
                "maxToolCallsPerMinute must be at least 1",
            ));
        }
        Ok(())
    }

    /// Merge an update into this policy. `null` tool entries remove the
    /// override.
    pub fn apply(&mut self, update: PolicyUpdate) {
        if let Some(default_policy) = update.default_policy {
            self.default_policy = default_policy;
        }
        if let Some(guardrails) = update.guardrails {
            self.guardrails = guardrails;
        }
        for (tool_id, allowed) in update.tools {
            match allowed {
                Some(allowed) => {
                    self.tools.insert(tool_id, allowed);
                },
                None => {
                    self.tools.remove(&tool_id);
                },
            }
        }
    }
}

/// A partial policy change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyUpdate {
    pub default_policy: Option<DefaultPolicy>,
    /// `true`/`false` set an override, `null` clears it.
    pub tools: BTreeMap<String, Option<bool>>,
    pub guardrails: Option<Guardrails>,
}

impl PolicyUpdate {
    /// Reject updates naming tools outside the catalog, including removals.
    pub fn validate(&self, catalog: &ToolCatalog) -> Result<()> {
        match self.tools.keys().find(|t| !catalog.contains(t)) {
            Some(tool_id) => Err(Error::unknown_tool(tool_id.as_str())),
            None => Ok(()),
        }
    }
}
