use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ToolPolicy;

/// Why a tool call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    UnknownTool,
    ToolForbidden,
    RateLimited,
}

impl AuthErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownTool => "unknown_tool",
            Self::ToolForbidden => "tool_forbidden",
            Self::RateLimited => "rate_limited",
        }
    }

    /// Only rate limiting clears up on its own.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationError {
    pub code: AuthErrorCode,
    pub retryable: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl AuthorizationError {
    pub fn unknown_tool(tool_id: &str) -> Self {
        Self::new(AuthErrorCode::UnknownTool, format!("unknown tool: {tool_id}"))
    }

    pub fn tool_forbidden(tool_id: &str) -> Self {
        Self::new(
            AuthErrorCode::ToolForbidden,
            format!("tool {tool_id} is not allowed for this agent"),
        )
    }

    pub fn rate_limited(limit: u32, retry_after: Duration) -> Self {
        Self {
            retry_after_ms: Some(u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX)),
            ..Self::new(
                AuthErrorCode::RateLimited,
                format!("more than {limit} tool calls in the last minute"),
            )
        }
    }

    fn new(code: AuthErrorCode, message: String) -> Self {
        Self {
            code,
            retryable: code.is_retryable(),
            message,
            retry_after_ms: None,
        }
    }
}

/// Outcome of one authorization check, with the policy it was made under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub policy: ToolPolicy,
    pub error: Option<AuthorizationError>,
}

impl AuthorizationDecision {
    pub fn allowed(policy: ToolPolicy) -> Self {
        Self {
            allowed: true,
            policy,
            error: None,
        }
    }

    pub fn denied(policy: ToolPolicy, error: AuthorizationError) -> Self {
        Self {
            allowed: false,
            policy,
            error: Some(error),
        }
    }

    pub fn error_code(&self) -> Option<AuthErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limit_is_retryable() {
        assert!(!AuthorizationError::unknown_tool("x").retryable);
        assert!(!AuthorizationError::tool_forbidden("x").retryable);
        assert!(AuthorizationError::rate_limited(3, Duration::from_secs(1)).retryable);
    }

    #[test]
    fn serializes_decision_shape() {
        let decision = AuthorizationDecision::denied(
            ToolPolicy::default(),
            AuthorizationError::rate_limited(3, Duration::from_millis(1500)),
        );
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["allowed"], false);
        assert_eq!(json["error"]["code"], "rate_limited");
        assert_eq!(json["error"]["retryable"], true);
        assert_eq!(json["error"]["retryAfterMs"], 1500);
        assert_eq!(json["policy"]["defaultPolicy"], "allow");

        let allowed = serde_json::to_value(AuthorizationDecision::allowed(ToolPolicy::default()))
            .unwrap();
        assert!(allowed["error"].is_null());
    }
}
