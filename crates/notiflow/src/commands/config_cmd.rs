//! Config subcommand handlers.

use notiflow_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = super::config_path(global);

    match args.command {
        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = super::load(global)?;
            let toml = notiflow_config::to_toml(&cfg)?;
            let out = output::render_single(global.output, &cfg, |_| toml.trim_end().to_owned())?;
            output::print_output(&out, global.quiet);
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
        }

        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            notiflow_config::save_config(&Config::default(), &path)?;
            if !global.quiet {
                eprintln!("Wrote default configuration to {}", path.display());
            }
        }
    }
    Ok(())
}
