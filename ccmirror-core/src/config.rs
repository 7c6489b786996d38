//! YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.ccmirror/
//!   config.yaml
//! ```
//!
//! # API pattern
//!
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! The three directory settings are optional at parse time so that a
//! partially filled file still loads; [`Config::validate_paths`] is the gate
//! the orchestrator runs before any I/O.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::DEFAULT_TABLE_NAME;

/// Environment variable consulted when `remote.password` is absent.
pub const PASSWORD_ENV: &str = "CCMIRROR_REMOTE_PASSWORD";

const DEFAULT_EXTENSION: &str = "csv";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_dir: Option<PathBuf>,
    /// Extension (without the dot) of request files.
    #[serde(default = "default_extension")]
    pub request_extension: String,
    #[serde(default)]
    pub csv: CsvConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            requests_dir: None,
            results_dir: None,
            logs_dir: None,
            request_extension: default_extension(),
            csv: CsvConfig::default(),
            remote: None,
        }
    }
}

/// Layout of request files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_true")]
    pub has_header: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: true,
        }
    }
}

/// Connection settings for the remote mirror table.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("table", &self.table)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Login material passed to the remote session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// The three directories, all present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPaths {
    pub requests_dir: PathBuf,
    pub results_dir: PathBuf,
    pub logs_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Check that the request, results and logs directories are configured.
    pub fn validate_paths(&self) -> Result<ValidatedPaths, ConfigError> {
        Ok(ValidatedPaths {
            requests_dir: required_path(&self.requests_dir, "requests_dir")?,
            results_dir: required_path(&self.results_dir, "results_dir")?,
            logs_dir: required_path(&self.logs_dir, "logs_dir")?,
        })
    }

    /// Remote section, with url and username present.
    pub fn remote(&self) -> Result<&RemoteConfig, ConfigError> {
        let remote = self.remote.as_ref().ok_or(ConfigError::Missing("remote"))?;
        if remote.url.trim().is_empty() {
            return Err(ConfigError::Missing("remote.url"));
        }
        if remote.username.trim().is_empty() {
            return Err(ConfigError::Missing("remote.username"));
        }
        Ok(remote)
    }
}

impl RemoteConfig {
    /// Credentials, falling back to [`PASSWORD_ENV`] for the password.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.credentials_with(|key| std::env::var(key).ok())
    }

    /// Same as [`RemoteConfig::credentials`] with an explicit env lookup.
    pub fn credentials_with<F>(&self, lookup: F) -> Result<Credentials, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let password = self
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| lookup(PASSWORD_ENV).filter(|p| !p.is_empty()))
            .ok_or(ConfigError::Missing("remote.password"))?;
        Ok(Credentials {
            username: self.username.clone(),
            password,
        })
    }
}

fn required_path(value: &Option<PathBuf>, name: &'static str) -> Result<PathBuf, ConfigError> {
    match value {
        Some(p) if !p.as_os_str().is_empty() => Ok(p.clone()),
        _ => Err(ConfigError::Missing(name)),
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<home>/.ccmirror/config.yaml`. Pure, no I/O.
pub fn default_config_path_at(home: &Path) -> PathBuf {
    home.join(".ccmirror").join("config.yaml")
}

/// `default_config_path_at` convenience wrapper.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    Ok(default_config_path_at(&home))
}

impl Config {
    /// Load a config file.
    ///
    /// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with
    /// path) if malformed YAML.
    pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `~/.ccmirror/config.yaml`.
    pub fn load() -> Result<Config, ConfigError> {
        Config::load_at(&default_config_path()?)
    }
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_delimiter() -> char {
    ';'
}

fn default_true() -> bool {
    true
}

fn default_table() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
