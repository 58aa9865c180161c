use std::{
    collections::HashMap,
    path::PathBuf,
    time::{Instant, SystemTime},
};

use {
    tokio::sync::Mutex,
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use portico_metrics::{authz as authz_metrics, counter, labels};

use crate::{
    AuthorizationDecision, AuthorizationError, InvocationWindow, PolicyStore, PolicyUpdate,
    Result, ToolCatalog, ToolPolicy,
};

/// A policy together with the file mtime it was read at.
#[derive(Debug, Clone)]
struct CachedPolicy {
    policy: ToolPolicy,
    modified_at: Option<SystemTime>,
}

struct AuthorizerState {
    store: Box<dyn PolicyStore>,
    policies: HashMap<String, CachedPolicy>,
    windows: HashMap<String, InvocationWindow>,
}

impl AuthorizerState {
    /// Cached policy if the store's mtime still matches, else a fresh load.
    ///
    /// Two missing mtimes match: an absent or unreadable file is a stable
    /// condition and does not force a reload.
    async fn reloaded_policy(
        &mut self,
        agent_id: &str,
        catalog: &ToolCatalog,
    ) -> Result<ToolPolicy> {
        let modified_at = self.store.modified_at(agent_id).await;

        if let Some(cached) = self.policies.get(agent_id)
            && cached.modified_at == modified_at
        {
            debug!(agent_id, "policy cache hit");
            #[cfg(feature = "metrics")]
            counter!(authz_metrics::POLICY_CACHE_TOTAL, labels::RESULT => "hit").increment(1);
            return Ok(cached.policy.clone());
        }

        debug!(agent_id, ?modified_at, "policy cache miss, loading");
        #[cfg(feature = "metrics")]
        counter!(authz_metrics::POLICY_CACHE_TOTAL, labels::RESULT => "miss").increment(1);

        let policy = self.store.load(agent_id, catalog).await?;
        self.policies.insert(agent_id.to_string(), CachedPolicy {
            policy: policy.clone(),
            modified_at,
        });
        Ok(policy)
    }
}

/// Decides whether an agent may call a tool right now.
///
/// All state sits behind one async mutex held for the whole of each call,
/// so the mtime-compare/reload/store sequence and the
/// prune/compare/record sequence never interleave with another call.
pub struct ToolAuthorizer {
    catalog: ToolCatalog,
    state: Mutex<AuthorizerState>,
}

impl ToolAuthorizer {
    pub fn new(store: impl PolicyStore + 'static, catalog: ToolCatalog) -> Self {
        Self {
            catalog,
            state: Mutex::new(AuthorizerState {
                store: Box::new(store),
                policies: HashMap::new(),
                windows: HashMap::new(),
            }),
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Repoint the store and forget every cached policy and window.
    pub async fn update_root(&self, root: PathBuf) {
        let mut state = self.state.lock().await;
        info!(root = %root.display(), "agents root changed, clearing policy caches");
        state.store.set_root(root);
        state.policies.clear();
        state.windows.clear();
    }

    /// Current policy for the agent. Store errors propagate.
    pub async fn get_policy(&self, agent_id: &str) -> Result<ToolPolicy> {
        let mut state = self.state.lock().await;
        state.reloaded_policy(agent_id, &self.catalog).await
    }

    /// Persist a policy change and cache the result at the post-write mtime.
    pub async fn update_policy(&self, agent_id: &str, update: PolicyUpdate) -> Result<ToolPolicy> {
        let mut state = self.state.lock().await;
        let policy = state.store.update(agent_id, update, &self.catalog).await?;
        let modified_at = state.store.modified_at(agent_id).await;
        state.policies.insert(agent_id.to_string(), CachedPolicy {
            policy: policy.clone(),
            modified_at,
        });
        info!(agent_id, "tool policy updated");
        Ok(policy)
    }

    /// Authorize one tool call. Only calls that pass the known-tool and
    /// policy checks reach the rate limiter, and only allowed calls are
    /// recorded in the window.
    pub async fn authorize(&self, agent_id: &str, tool_id: &str) -> Result<AuthorizationDecision> {
        self.authorize_with_clock(agent_id, tool_id, Instant::now).await
    }

    /// `now` is read once the call holds the state lock, keeping every
    /// window in time order.
    async fn authorize_with_clock(
        &self,
        agent_id: &str,
        tool_id: &str,
        now: impl FnOnce() -> Instant,
    ) -> Result<AuthorizationDecision> {
        let mut state = self.state.lock().await;
        let policy = state.reloaded_policy(agent_id, &self.catalog).await?;

        let decision = if !self.catalog.contains(tool_id) {
            AuthorizationDecision::denied(policy, AuthorizationError::unknown_tool(tool_id))
        } else if !policy.allows(tool_id) {
            AuthorizationDecision::denied(policy, AuthorizationError::tool_forbidden(tool_id))
        } else {
            let limit = policy.guardrails.max_tool_calls_per_minute;
            let window = state.windows.entry(agent_id.to_string()).or_default();
            match window.try_record(limit, now()) {
                Ok(()) => AuthorizationDecision::allowed(policy),
                Err(retry_after) => AuthorizationDecision::denied(
                    policy,
                    AuthorizationError::rate_limited(limit, retry_after),
                ),
            }
        };

        let outcome = decision.error_code().map_or("allowed", |code| code.as_str());
        debug!(agent_id, tool_id, outcome, "tool call authorized");
        #[cfg(feature = "metrics")]
        counter!(authz_metrics::DECISIONS_TOTAL, labels::OUTCOME => outcome).increment(1);
        Ok(decision)
    }
}
