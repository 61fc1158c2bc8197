use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment-based path configuration
#[derive(Debug, Clone)]
pub struct EnvPaths {
    /// Directory relative paths are resolved against.
    pub base_path: PathBuf,
    pub data_path: PathBuf,
    pub configuration_path: PathBuf,
}

impl EnvPaths {
    /// Load paths from environment variables with an optional base directory,
    /// reading the base directory's `.env` first
    pub fn load_with_base(base_dir: Option<PathBuf>) -> Result<Self> {
        let base = match base_dir {
            Some(base) => base,
            None => env::current_dir().context("Failed to get current directory")?,
        };

        let env_file = base.join(".env");
        if env_file.exists() {
            dotenv::from_path(&env_file).ok();
        }

        Ok(Self {
            base_path: base.clone(),
            data_path: Self::get_path_from_env("DATA_PATH", "./data", &base),
            configuration_path: Self::get_path_from_env("CONFIGURATION_PATH", "./config", &base),
        })
    }

    /// Get a path from environment variable or use default
    fn get_path_from_env(var_name: &str, default: &str, base_dir: &Path) -> PathBuf {
        let path = PathBuf::from(env::var(var_name).unwrap_or_else(|_| default.to_string()));

        // If the path is relative, make it relative to the base directory
        if path.is_relative() {
            base_dir.join(path)
        } else {
            path
        }
    }

    /// Get the default database path
    pub fn database_path(&self) -> PathBuf {
        self.data_path.join("auth.db")
    }

    /// Get the logs directory path
    pub fn logs_path(&self) -> PathBuf {
        self.data_path.join("logs")
    }

    /// Configuration file of an environment
    pub fn config_file(&self, environment: &str) -> PathBuf {
        self.configuration_path
            .join(format!("config.auth.{}.yaml", environment))
    }
}

/// Get the current environment (dev, staging, production)
pub fn get_environment() -> String {
    env::var("ENVIRONMENT")
        .unwrap_or_else(|_| env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string()))
}
