mod config_commands;
mod delivery_commands;
mod policy_commands;

use std::path::PathBuf;

use {
    anyhow::bail,
    clap::{Parser, Subcommand},
    portico_config::PorticoConfig,
    portico_metrics::{MetricsRecorderConfig, init_metrics},
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "portico", about = "Portico, channel delivery and tool authorization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to load instead of searching the default locations.
    #[arg(long, global = true, env = "PORTICO_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Print collected metrics in Prometheus format to stderr on exit.
    #[arg(long, global = true, default_value_t = false)]
    dump_metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether an agent may call a tool right now.
    Authorize {
        #[arg(long)]
        agent: String,
        #[arg(long)]
        tool: String,
    },
    /// Inspect or change an agent's tool policy.
    Policy {
        #[command(subcommand)]
        action: policy_commands::PolicyAction,
    },
    /// List the known tool ids.
    Tools,
    /// Send a message to a user over a channel.
    Deliver {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        content: String,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// Logs always go to stderr; stdout is reserved for decision, policy and
/// config JSON so it can be piped.
fn init_telemetry(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let subscriber = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer().with_writer(std::io::stderr);

    if cli.json_logs {
        subscriber.with(layer.json().with_target(true)).init();
    } else {
        subscriber.with(layer.with_target(false)).init();
    }
}

/// Load the config named on the command line, or discover one.
fn load(cli: &Cli) -> anyhow::Result<PorticoConfig> {
    match &cli.config {
        Some(path) => portico_config::load_config(path),
        None => portico_config::discover_and_load(),
    }
}

/// Refuse to run a command against a config that failed validation.
fn ensure_valid(config: &PorticoConfig) -> anyhow::Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    bail!("invalid configuration: {joined}")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "portico starting");

    let config = load(&cli)?;
    let metrics = init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        global_labels: vec![("service".into(), "portico".into())],
    })?;

    let result = match cli.command {
        Commands::Config { action } => {
            config_commands::handle_config(action, &config, cli.config.as_deref())
        },
        Commands::Authorize { ref agent, ref tool } => {
            ensure_valid(&config)?;
            policy_commands::handle_authorize(&config, agent, tool).await
        },
        Commands::Policy { action } => {
            ensure_valid(&config)?;
            policy_commands::handle_policy(&config, action).await
        },
        Commands::Tools => {
            ensure_valid(&config)?;
            policy_commands::handle_tools(&config);
            Ok(())
        },
        Commands::Deliver {
            ref channel,
            ref user,
            ref content,
        } => {
            ensure_valid(&config)?;
            delivery_commands::handle_deliver(&config, channel, user, content).await
        },
    };

    if cli.dump_metrics {
        let rendered = metrics.render();
        if rendered.is_empty() {
            debug!("no metrics recorded");
        } else {
            eprintln!("{rendered}");
        }
    }

    result
}
