use super::env_paths::{get_environment, EnvPaths};
use anyhow::{anyhow, Context, Result};
use authz::AuthConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file; defaults to `<data_path>/auth.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Contents of `config.auth.<environment>.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthConfig,
}

/// Settings together with where they came from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub environment: String,
    /// `None` when no configuration file exists and defaults are in use.
    pub source: Option<PathBuf>,
    pub database_path: PathBuf,
}

impl Settings {
    /// Parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    /// Apply the `AUTH_ENABLED`, `IAM_ADDRESS`, `IAM_APP_SECRET` and
    /// `SERVER_PORT` overrides.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(enabled) = lookup("AUTH_ENABLED") {
            self.auth.enabled = parse_bool(&enabled)
                .ok_or_else(|| anyhow!("AUTH_ENABLED must be true or false, got '{}'", enabled))?;
        }
        if let Some(address) = lookup("IAM_ADDRESS") {
            self.auth.iam_address = address;
        }
        if let Some(secret) = lookup("IAM_APP_SECRET") {
            self.auth.app_secret = secret;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("SERVER_PORT must be a port number, got '{}'", port))?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load the settings of the current environment. A missing file falls back
/// to defaults.
pub fn load_settings(paths: &EnvPaths) -> Result<LoadedSettings> {
    let environment = get_environment();
    let file = paths.config_file(&environment);

    let (mut settings, source) = if file.exists() {
        debug!("Loading configuration from {}", file.display());
        (Settings::from_file(&file)?, Some(file))
    } else {
        debug!(
            "No configuration at {}, using defaults",
            file.display()
        );
        (Settings::default(), None)
    };
    settings.apply_overrides(|name| env::var(name).ok())?;

    // DATA_PATH wins over the configured database location
    let database_path = match (&settings.database.path, env::var("DATA_PATH").is_ok()) {
        (Some(path), false) if path.is_absolute() => path.clone(),
        (Some(path), false) => paths.base_path.join(path),
        _ => paths.database_path(),
    };

    Ok(LoadedSettings {
        settings,
        environment,
        source,
        database_path,
    })
}
