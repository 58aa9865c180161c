use std::collections::BTreeSet;

/// Tool ids known to the gateway when no explicit list is configured.
pub const BUILTIN_TOOLS: &[&str] = &[
    "browser",
    "cron",
    "exec",
    "location",
    "map",
    "memory_search",
    "process",
    "send_image",
    "session_state",
    "spawn_agent",
    "web_fetch",
    "web_search",
];

/// The fixed set of valid tool ids. Only membership is ever asked of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCatalog {
    ids: BTreeSet<String>,
}

impl ToolCatalog {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_TOOLS.iter().copied())
    }

    /// The configured list, or the built-in catalog when it is empty.
    pub fn from_config(known_tools: &[String]) -> Self {
        if known_tools.is_empty() {
            Self::builtin()
        } else {
            Self::new(known_tools.iter().map(|t| t.trim().to_string()))
        }
    }

    pub fn contains(&self, tool_id: &str) -> bool {
        self.ids.contains(tool_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
