//! Command handlers.

pub mod config_cmd;
pub mod replay;

use std::path::PathBuf;

use notiflow_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file selected by `--config`, or the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(notiflow_config::config_path)
}

/// Load the effective configuration (file + environment).
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_path(global);
    tracing::debug!(path = %path.display(), "loading config");
    Ok(notiflow_config::load_config_from(&path)?)
}
