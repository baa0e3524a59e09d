use anyhow::{Context, Result};
use colored::*;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "CLOUDSHELL_OPEN_CONFIG";
pub const ENV_PREFIX: &str = "CLOUDSHELL_OPEN";
pub const DEFAULT_REGION: &str = "us-central1";

pub const DEFAULT_CONFIG: &str = include_str!("templates/config.default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub gcloud: GcloudSettings,
    #[serde(default)]
    pub editor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcloudSettings {
    pub binary: String,
    pub region: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
}

impl Settings {
    /// Defaults, then `path` if it exists, then `CLOUDSHELL_OPEN__*` variables.
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), exists = path.exists(), "loading configuration");

        let config = Config::builder()
            .set_default("gcloud.binary", "gcloud")?
            .set_default("gcloud.region", DEFAULT_REGION)?
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Editor from config, then `$EDITOR`, then `vi`.
    pub fn editor(&self) -> String {
        self.editor
            .clone()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
            .unwrap_or_else(|| "vi".to_string())
    }
}

/// `$CLOUDSHELL_OPEN_CONFIG`, or `config.toml` under the platform config dir.
pub fn config_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut default_path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
            default_path.push("cloudshell-open");
            default_path.push("config.toml");
            default_path
        })
}

/// Writes the default config if nothing is at `path` yet. Returns whether a
/// file was created.
pub fn ensure_config_file(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    // stdout carries command output only
    eprintln!(
        "  {} Configuration file not found at {:?}. Creating a default one.",
        "ℹ".bold().blue(),
        path
    );
    write_default_config(path)?;
    Ok(true)
}

pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write configuration to {:?}", path))?;
    Ok(())
}
