use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{env_subst::substitute_env, schema::PorticoConfig};

/// Accepted `portico.*` names; TOML wins when several exist in one dir.
const CONFIG_FILENAMES: &[&str] = &[
    "portico.toml",
    "portico.yaml",
    "portico.yml",
    "portico.json",
];

/// Read `path`, expand `${VAR}` placeholders, and parse by extension.
pub fn load_config(path: &Path) -> anyhow::Result<PorticoConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read portico config {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Config for a run without `--config`: the first file found by
/// [`find_config_file`], or defaults (10 s delivery timeout, built-in tool
/// catalog, agents under [`data_dir`]) when there is none.
///
/// A file that exists but does not parse is an error.
pub fn discover_and_load() -> anyhow::Result<PorticoConfig> {
    match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(PorticoConfig::default())
        },
    }
}

/// `./portico.*` first, then the same names under [`config_dir`].
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Per-user portico config directory, e.g. `~/.config/portico/` on Linux.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "portico").map(|d| d.config_dir().to_path_buf())
}

/// Where agent policy directories live unless `policy.agents_root` says
/// otherwise. Falls back to `./.portico` when no home directory is known.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "portico")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".portico"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<PorticoConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
