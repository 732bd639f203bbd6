//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use notiflow_config::ConfigError;
use notiflow_core::CoreError;

/// Process exit codes. Usage errors exit with clap's code 2.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const INPUT: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(notiflow::config),
        help("Check the config file with: notiflow config show")
    )]
    Config(#[from] ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(notiflow::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Pipeline ─────────────────────────────────────────────────────

    #[error("Pipeline error: {0}")]
    #[diagnostic(code(notiflow::pipeline))]
    Pipeline(#[from] CoreError),

    // ── Replay input ─────────────────────────────────────────────────

    #[error("Invalid record on line {line}: {reason}")]
    #[diagnostic(
        code(notiflow::invalid_record),
        help(
            "Each line must be a JSON object with a \"type\" of\n\
             connected, posted, removed or disconnected."
        )
    )]
    InvalidRecord { line: usize, reason: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(notiflow::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_)
            | Self::ConfigExists { .. }
            | Self::Pipeline(CoreError::Config { .. }) => exit_code::CONFIG,
            Self::InvalidRecord { .. } => exit_code::INPUT,
            Self::Pipeline(_) | Self::Io(_) | Self::Render(_) => exit_code::GENERAL,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Render(err.to_string())
    }
}
