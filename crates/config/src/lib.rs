//! Configuration loading, env substitution, and validation.
//!
//! Config files: `portico.toml`, `portico.yaml`, `portico.yml` or
//! `portico.json`, searched in `./` then `~/.config/portico/`.
//!
//! `${ENV_VAR}` placeholders are substituted before parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, data_dir, discover_and_load, find_config_file, load_config},
    schema::{DeliveryConfig, MetricsConfig, PolicyConfig, PorticoConfig},
    validate::ValidationError,
};
