//! Process configuration resolved from the environment.
//!
//! Layered with the `config` crate: built-in defaults first, then
//! `MEMOSPHERE_*` variables on top. Blank values count as unset.
//!
//! - `MEMOSPHERE_DB_PATH`: SQLite file path, default `memosphere.db`.
//! - `MEMOSPHERE_LOG_LEVEL`: `trace|debug|info|warn|error`, default
//!   [`default_log_level`].
//! - `MEMOSPHERE_LOG_DIR`: absolute directory for rolling logs. Logging stays
//!   off when unset.

use crate::logging::{default_log_level, normalize_level};
use ::config::{Config, Environment, Map};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const ENV_PREFIX: &str = "MEMOSPHERE";

pub const DB_PATH_VAR: &str = "MEMOSPHERE_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "MEMOSPHERE_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "MEMOSPHERE_LOG_DIR";
pub const DEFAULT_DB_PATH: &str = "memosphere.db";

/// Configuration could not be loaded or holds an invalid value.
#[derive(Debug)]
pub enum ConfigError {
    /// Source layering or deserialization failed.
    Load(::config::ConfigError),
    InvalidValue { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "failed to load configuration: {err}"),
            Self::InvalidValue { key, message } => write!(f, "invalid `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<::config::ConfigError> for ConfigError {
    fn from(value: ::config::ConfigError) -> Self {
        Self::Load(value)
    }
}

/// Settings needed to bootstrap the store and its logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

/// Layered values before trimming and validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    db_path: String,
    log_level: String,
    #[serde(default)]
    log_dir: Option<String>,
}

impl CoreConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    /// Resolves configuration from an explicit variable set instead of the
    /// process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Map<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::load(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        // MEMOSPHERE_DB_PATH -> db_path
        let raw: RawConfig = Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("log_level", default_log_level())?
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = non_blank(&raw.db_path) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = non_blank(&raw.log_level) {
            config.log_level = normalize_level(level).map_err(|message| {
                ConfigError::InvalidValue {
                    key: LOG_LEVEL_VAR,
                    message,
                }
            })?;
        }
        if let Some(dir) = raw.log_dir.as_deref().and_then(non_blank) {
            let dir = PathBuf::from(dir);
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: LOG_DIR_VAR,
                    message: format!("expected an absolute path, got `{}`", dir.display()),
                });
            }
            config.log_dir = Some(dir);
        }

        Ok(config)
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
