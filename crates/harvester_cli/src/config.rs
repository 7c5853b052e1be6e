//! Layered configuration: defaults, then an optional RON file, then
//! environment variables, then command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::engine_info;
use harvester_engine::{EngineConfig, FetchSettings, DEFAULT_MAX_CONCURRENCY};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

pub const ENV_TIMEOUT: &str = "API_TIMEOUT";
pub const ENV_USER_AGENT: &str = "USER_AGENT";
pub const ENV_ACCEPT_INVALID_CERTS: &str = "HARVESTER_ACCEPT_INVALID_CERTS";
pub const ENV_MAX_CONCURRENCY: &str = "HARVESTER_MAX_CONCURRENCY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid value {value:?} for {name}: {reason}")]
    Env {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("timeout_secs must be at least 1")]
    ZeroTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
    pub error_for_status: bool,
    pub max_concurrency: usize,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            timeout_secs: fetch.request_timeout.as_secs(),
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            user_agent: fetch.user_agent,
            accept_invalid_certs: fetch.accept_invalid_certs,
            error_for_status: fetch.error_for_status,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            redirect_limit: fetch.redirect_limit,
            max_bytes: fetch.max_bytes,
        }
    }
}

impl AppConfig {
    /// Resolves the effective configuration for one run.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.apply_cli(cli);
        config.validate()?;
        engine_info!("Effective configuration: {config:?}");
        Ok(config)
    }

    /// Reads a RON file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Applies the environment variables named by the `ENV_*` constants.
    /// `lookup` returns a variable's value, if set.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_TIMEOUT) {
            self.timeout_secs = parse_env(ENV_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_USER_AGENT) {
            if !value.trim().is_empty() {
                self.user_agent = value;
            }
        }
        if let Some(value) = lookup(ENV_ACCEPT_INVALID_CERTS) {
            self.accept_invalid_certs = parse_env_bool(ENV_ACCEPT_INVALID_CERTS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
            self.max_concurrency = parse_env(ENV_MAX_CONCURRENCY, &value)?;
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(timeout) = cli.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(user_agent) = &cli.user_agent {
            self.user_agent = user_agent.clone();
        }
        if cli.verify_tls {
            self.accept_invalid_certs = false;
        }
        if cli.strict {
            self.error_for_status = true;
        }
        if let Some(concurrency) = cli.concurrency {
            self.max_concurrency = concurrency;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            fetch: FetchSettings {
                user_agent: self.user_agent.clone(),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
                request_timeout: Duration::from_secs(self.timeout_secs),
                accept_invalid_certs: self.accept_invalid_certs,
                error_for_status: self.error_for_status,
                redirect_limit: self.redirect_limit,
                max_bytes: self.max_bytes,
            },
            max_concurrency: self.max_concurrency,
        }
    }
}

fn parse_env<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err: T::Err| ConfigError::Env {
        name,
        value: value.to_string(),
        reason: err.to_string(),
    })
}

fn parse_env_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            name,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
