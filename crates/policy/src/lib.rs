//! Tool authorization for agents.
//!
//! Each agent has a [`ToolPolicy`] stored outside the process. The
//! [`ToolAuthorizer`] caches policies keyed by the policy file's
//! modification time and keeps a sliding one-minute window of accepted
//! calls per agent to enforce the policy's rate guardrail.
//!
//! Decision order for `authorize(agent, tool)`:
//! 1. Unknown tool id → `unknown_tool`
//! 2. Override or default policy denies → `tool_forbidden`
//! 3. Window already full → `rate_limited` (retryable)
//! 4. Otherwise allowed, and the call is recorded in the window

pub mod authorizer;
pub mod catalog;
pub mod decision;
pub mod error;
pub mod store;
pub mod types;
pub mod window;

pub use {
    authorizer::ToolAuthorizer,
    catalog::{BUILTIN_TOOLS, ToolCatalog},
    decision::{AuthErrorCode, AuthorizationDecision, AuthorizationError},
    error::{Error, Result},
    store::{FilePolicyStore, PolicyStore, TOOLS_CONFIG_FILE},
    types::{DefaultPolicy, Guardrails, PolicyUpdate, ToolPolicy},
    window::{InvocationWindow, WINDOW},
};
