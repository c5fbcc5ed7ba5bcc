pub mod apportion;
pub mod build;

use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::{cli::Cli, config::BuildConfig};

const DEFAULT_CONFIG: &str = "kuiki.toml";

/// The `--config` file, else `./kuiki.toml` if present, else defaults.
pub(crate) fn load_config(cli: &Cli) -> Result<BuildConfig> {
    match &cli.config {
        Some(path) => BuildConfig::load_from_file(path),
        None if Path::new(DEFAULT_CONFIG).exists() => BuildConfig::load_from_file(Path::new(DEFAULT_CONFIG)),
        None => {
            debug!("no config file; using defaults");
            Ok(BuildConfig::default())
        }
    }
}
