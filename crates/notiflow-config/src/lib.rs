//! Shared configuration for notiflow embedders and the CLI.
//!
//! TOML file plus `NOTIFLOW_` environment overrides, layered over
//! built-in defaults with figment, and translation to
//! `notiflow_core::PipelineConfig`. The policy section is also served
//! live through [`FileConfigStore`].

mod store;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use notiflow_core::{
    ALIPAY_PACKAGE, DEFAULT_BUS_CAPACITY, PipelineConfig, PolicySnapshot, ReconnectConfig,
};

pub use store::FileConfigStore;

/// Prefix of environment overrides; nested keys are split on `__`,
/// e.g. `NOTIFLOW_POLICY__EMIT_GROUP_SUMMARIES=true`.
pub const ENV_PREFIX: &str = "NOTIFLOW_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Runtime-tunable filtering flags.
    #[serde(default)]
    pub policy: PolicySnapshot,

    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub reconnect: ReconnectSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineSection {
    /// Package names whose notifications are classified.
    #[serde(default = "default_sources")]
    pub supported_sources: Vec<String>,

    /// Per-subscriber event buffer.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            supported_sources: default_sources(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconnectSection {
    #[serde(default = "default_reconnect_secs")]
    pub delay_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_reconnect_secs")]
    pub manual_window_secs: u64,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            delay_secs: default_reconnect_secs(),
            max_attempts: default_max_attempts(),
            manual_window_secs: default_reconnect_secs(),
        }
    }
}

fn default_sources() -> Vec<String> {
    vec![ALIPAY_PACKAGE.into()]
}
fn default_bus_capacity() -> usize {
    DEFAULT_BUS_CAPACITY
}
fn default_reconnect_secs() -> u64 {
    15
}
fn default_max_attempts() -> u32 {
    3
}

impl Config {
    /// Check the values a pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.bus_capacity == 0 {
            return Err(invalid("pipeline.bus_capacity", "must be greater than zero"));
        }
        if self.pipeline.supported_sources.iter().all(|s| s.trim().is_empty()) {
            return Err(invalid(
                "pipeline.supported_sources",
                "must name at least one package",
            ));
        }
        if self.reconnect.delay_secs == 0 {
            return Err(invalid("reconnect.delay_secs", "must be greater than zero"));
        }
        Ok(())
    }

    /// Build the core pipeline configuration.
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        self.validate()?;

        let supported_sources: HashSet<String> = self
            .pipeline
            .supported_sources
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(PipelineConfig {
            supported_sources,
            bus_capacity: self.pipeline.bus_capacity,
            reconnect: ReconnectConfig {
                delay: Duration::from_secs(self.reconnect.delay_secs),
                max_attempts: self.reconnect.max_attempts,
                manual_window: Duration::from_secs(self.reconnect.manual_window_secs),
            },
        })
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "notiflow", "notiflow").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("notiflow");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate config from `path` + environment.
/// A missing file is not an error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Read only the policy section. Used by [`FileConfigStore`].
pub fn load_policy(path: &Path) -> Result<PolicySnapshot, ConfigError> {
    Ok(figment_for(path).extract_inner("policy")?)
}

// ── Config saving ───────────────────────────────────────────────────

/// Render a config as pretty TOML.
pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

/// Serialize config to TOML and write it to `path`, creating parent dirs.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_toml(cfg)?)?;
    Ok(())
}
