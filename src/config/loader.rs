//! Configuration loading from disk and environment.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Deployment environment; selects `config.<env>.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Develop,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Develop => "develop",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Environment::Local),
            "develop" => Ok(Environment::Develop),
            "prod" => Ok(Environment::Prod),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file path is empty")]
    EmptyPath,
    #[error("invalid environment: {0}")]
    InvalidEnvironment(String),
    #[error("failed to read {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value}")]
    Override { key: &'static str, value: String },
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load `config.<env>.toml` from `dir`, apply environment overrides and validate.
///
/// A missing file is not an error: the defaults are used.
pub fn load_config(env: Environment, dir: &Path) -> Result<ServiceConfig, ConfigError> {
    load_config_with(env, dir, |key| std::env::var(key).ok())
}

/// Like [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(env: Environment, dir: &Path, lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if dir.as_os_str().is_empty() {
        return Err(ConfigError::EmptyPath);
    }

    let path = dir.join(format!("config.{}.toml", env));
    let mut config: ServiceConfig = match fs::read_to_string(&path) {
        Ok(content) => toml::from_str(&content)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = ?path, "Config file not found, using defaults");
            ServiceConfig::default()
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };

    config.app.env = env.to_string();
    apply_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Environment variables that take precedence over the file.
fn apply_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("APP_BIND_ADDRESS") {
        config.app.bind_address = addr;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(value) = lookup("SHUTDOWN_TIMEOUT_SECS") {
        config.shutdown.total_timeout_secs = value.parse().map_err(|_| ConfigError::Override {
            key: "SHUTDOWN_TIMEOUT_SECS",
            value,
        })?;
    }
    Ok(())
}
