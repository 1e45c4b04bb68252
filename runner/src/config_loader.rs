//! Hierarchical configuration loading
//!
//! Precedence, lowest to highest:
//! 1. Built-in defaults
//! 2. `reconciler.yaml` in the working directory, or the `--config` file
//! 3. `RECONCILER_*` environment variables, `__` separating nested keys
//!    (`RECONCILER_BACKEND__ADMIN_TOKEN`)

use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use reconciler_core::Config;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "reconciler.yaml";
pub const ENV_PREFIX: &str = "RECONCILER_";

pub fn load(path: Option<&Path>) -> Result<Config> {
    let file = match path {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            Yaml::file(path)
        }
        None => Yaml::file(DEFAULT_CONFIG_FILE),
    };

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(file)
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    extract(figment)
}

fn extract(figment: Figment) -> Result<Config> {
    let config: Config = figment
        .extract()
        .context("Failed to extract configuration from figment")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
