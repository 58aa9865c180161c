//! Semantic checks that serde cannot express.
use std::fmt;

use crate::schema::PorticoConfig;

/// A single problem found in a loaded config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending key, e.g. `delivery.timeout_secs`.
    pub path: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl PorticoConfig {
    /// Returns every problem found; empty means the config is usable.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(1..=300).contains(&self.delivery.timeout_secs) {
            errors.push(ValidationError {
                path: "delivery.timeout_secs",
                message: format!(
                    "must be between 1 and 300, got {}",
                    self.delivery.timeout_secs
                ),
            });
        }

        if let Some(path) = &self.delivery.registry_path
            && path.as_os_str().is_empty()
        {
            errors.push(ValidationError {
                path: "delivery.registry_path",
                message: "must not be empty".into(),
            });
        }

        if let Some(root) = &self.policy.agents_root
            && root.as_os_str().is_empty()
        {
            errors.push(ValidationError {
                path: "policy.agents_root",
                message: "must not be empty".into(),
            });
        }

        for tool in &self.policy.known_tools {
            if tool.trim().is_empty() {
                errors.push(ValidationError {
                    path: "policy.known_tools",
                    message: "tool ids must not be blank".into(),
                });
                break;
            }
        }

        errors
    }
}
