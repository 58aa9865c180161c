use portico_common::FromMessage;

/// Policy store and validation failures.
///
/// These surface from `get_policy`, `update_policy` and `authorize` as hard
/// errors; they are never folded into an authorization decision.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid agent id: {agent_id:?}")]
    InvalidAgentId { agent_id: String },

    #[error("unknown tool id: {tool_id}")]
    UnknownTool { tool_id: String },

    #[error("invalid policy: {reason}")]
    InvalidPolicy { reason: String },

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn invalid_agent_id(agent_id: impl Into<String>) -> Self {
        Self::InvalidAgentId {
            agent_id: agent_id.into(),
        }
    }

    #[must_use]
    pub fn unknown_tool(tool_id: impl Into<String>) -> Self {
        Self::UnknownTool {
            tool_id: tool_id.into(),
        }
    }

    #[must_use]
    pub fn invalid_policy(reason: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            reason: reason.into(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

portico_common::impl_context!();
