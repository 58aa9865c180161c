//! CLI commands for tool policies and authorization checks.

use std::collections::BTreeMap;

use {
    anyhow::Result,
    clap::{Subcommand, ValueEnum},
    portico_config::PorticoConfig,
    portico_policy::{
        DefaultPolicy, FilePolicyStore, Guardrails, PolicyUpdate, ToolAuthorizer, ToolCatalog,
    },
};

#[derive(Subcommand)]
pub enum PolicyAction {
    /// Print the agent's effective policy.
    Show {
        #[arg(long)]
        agent: String,
    },
    /// Change the agent's policy and print the result.
    Set {
        #[arg(long)]
        agent: String,
        /// Policy for tools without an override.
        #[arg(long = "default", value_enum)]
        default_policy: Option<DefaultArg>,
        /// Allow a tool regardless of the default.
        #[arg(long)]
        allow: Vec<String>,
        /// Forbid a tool regardless of the default.
        #[arg(long)]
        deny: Vec<String>,
        /// Remove a tool's override.
        #[arg(long)]
        clear: Vec<String>,
        /// Accepted tool calls per minute.
        #[arg(long)]
        max_calls: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DefaultArg {
    Allow,
    Deny,
}

impl From<DefaultArg> for DefaultPolicy {
    fn from(arg: DefaultArg) -> Self {
        match arg {
            DefaultArg::Allow => Self::Allow,
            DefaultArg::Deny => Self::Deny,
        }
    }
}

fn catalog(config: &PorticoConfig) -> ToolCatalog {
    ToolCatalog::from_config(&config.policy.known_tools)
}

fn authorizer(config: &PorticoConfig) -> ToolAuthorizer {
    ToolAuthorizer::new(
        FilePolicyStore::new(config.policy.resolved_agents_root()),
        catalog(config),
    )
}

/// Later flags win when one tool is named more than once.
fn build_update(
    default_policy: Option<DefaultArg>,
    allow: Vec<String>,
    deny: Vec<String>,
    clear: Vec<String>,
    max_calls: Option<u32>,
) -> PolicyUpdate {
    let mut tools = BTreeMap::new();
    tools.extend(allow.into_iter().map(|t| (t, Some(true))));
    tools.extend(deny.into_iter().map(|t| (t, Some(false))));
    tools.extend(clear.into_iter().map(|t| (t, None)));
    PolicyUpdate {
        default_policy: default_policy.map(Into::into),
        tools,
        guardrails: max_calls.map(|max_tool_calls_per_minute| Guardrails {
            max_tool_calls_per_minute,
        }),
    }
}

pub async fn handle_authorize(config: &PorticoConfig, agent: &str, tool: &str) -> Result<()> {
    let decision = authorizer(config).authorize(agent, tool).await?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    if !decision.allowed {
        std::process::exit(1);
    }
    Ok(())
}

pub async fn handle_policy(config: &PorticoConfig, action: PolicyAction) -> Result<()> {
    let authorizer = authorizer(config);
    let policy = match action {
        PolicyAction::Show { agent } => authorizer.get_policy(&agent).await?,
        PolicyAction::Set {
            agent,
            default_policy,
            allow,
            deny,
            clear,
            max_calls,
        } => {
            let update = build_update(default_policy, allow, deny, clear, max_calls);
            authorizer.update_policy(&agent, update).await?
        },
    };
    println!("{}", serde_json::to_string_pretty(&policy)?);
    Ok(())
}

pub fn handle_tools(config: &PorticoConfig) {
    for tool in catalog(config).iter() {
        println!("{tool}");
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, portico_policy::ToolPolicy};

    #[test]
    fn update_from_flags() {
        let update = build_update(
            Some(DefaultArg::Deny),
            vec!["search".into(), "exec".into()],
            vec!["exec".into()],
            vec!["browser".into()],
            Some(5),
        );
        assert_eq!(update.default_policy, Some(DefaultPolicy::Deny));
        assert_eq!(
            update.tools,
            BTreeMap::from([
                ("browser".to_string(), None),
                ("exec".to_string(), Some(false)),
                ("search".to_string(), Some(true)),
            ])
        );
        assert_eq!(update.guardrails.unwrap().max_tool_calls_per_minute, 5);
    }

    #[test]
    fn empty_flags_change_nothing() {
        let update = build_update(None, vec![], vec![], vec![], None);
        assert_eq!(update, PolicyUpdate::default());
    }

    #[tokio::test]
    async fn set_then_show_round_trips_through_agents_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PorticoConfig::default();
        config.policy.agents_root = Some(dir.path().to_path_buf());

        let update = build_update(
            Some(DefaultArg::Deny),
            vec!["web_search".into()],
            vec![],
            vec![],
            None,
        );
        let saved = authorizer(&config)
            .update_policy("main", update)
            .await
            .unwrap();

        let loaded: ToolPolicy = authorizer(&config).get_policy("main").await.unwrap();
        assert_eq!(loaded, saved);
        assert!(dir.path().join("main/tools.json").exists());
    }
}
