use std::path::Path;

use {anyhow::Result, clap::Subcommand, portico_config::PorticoConfig};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration and print the effective values.
    Check,
}

pub fn handle_config(
    action: ConfigAction,
    config: &PorticoConfig,
    explicit: Option<&Path>,
) -> Result<()> {
    match action {
        ConfigAction::Check => check(config, explicit),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: &PorticoConfig, explicit: Option<&Path>) -> Result<()> {
    match explicit
        .map(Path::to_path_buf)
        .or_else(portico_config::find_config_file)
    {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    let errors = config.validate();
    for e in &errors {
        eprintln!("  {BOLD}{RED}error{RESET} {}: {}", e.path, e.message);
    }
    if !errors.is_empty() {
        eprintln!("\n{} error(s)", errors.len());
        std::process::exit(1);
    }

    eprintln!("No issues found.");
    println!("{}", serde_json::to_string_pretty(config)?);
    eprintln!(
        "agents root: {}",
        config.policy.resolved_agents_root().display()
    );
    Ok(())
}
