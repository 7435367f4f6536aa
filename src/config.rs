//! Configuration file loading for CLI defaults.
//!
//! The file is optional TOML. Every key is optional; CLI flags override
//! file values, which override built-in defaults.
//!
//! ```toml
//! catalog_path = "./catalog.csv"
//! output_dir = "./downloads"
//! bucket = "my-bucket"
//! region = "eu-west-2"
//! mirror_base_url = "https://my-bucket.s3.eu-west-2.amazonaws.com"
//! archive_concurrency = 20
//! categories = [0, 500, 600]
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Directory name under the user config root.
const CONFIG_DIR_NAME: &str = "harvester";

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors raised while loading or validating the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for `{field}`: {value}. Expected range: {expected}")]
    Invalid {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// TOML-backed file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub catalog_path: Option<PathBuf>,
    /// Directory for local and mirror transfers.
    pub output_dir: Option<PathBuf>,
    pub metadata_url: Option<String>,
    pub classify_url: Option<String>,
    pub download_base_url: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Public base URL of the bucket for mirror transfers.
    pub mirror_base_url: Option<String>,
    pub classify_concurrency: Option<usize>,
    pub archive_concurrency: Option<usize>,
    pub local_concurrency: Option<usize>,
    /// Category allow-list in hundreds.
    pub categories: Option<Vec<u16>>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Parses config text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys, and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_concurrency("classify_concurrency", self.classify_concurrency)?;
        validate_concurrency("archive_concurrency", self.archive_concurrency)?;
        validate_concurrency("local_concurrency", self.local_concurrency)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;

        if let Some(categories) = &self.categories
            && let Some(bad) = categories.iter().find(|c| **c > 900 || **c % 100 != 0)
        {
            return Err(ConfigError::Invalid {
                field: "categories",
                value: bad.to_string(),
                expected: "multiples of 100 in 0..=900",
            });
        }
        Ok(())
    }
}

fn validate_concurrency(field: &'static str, value: Option<usize>) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=100).contains(&value) {
        return Err(ConfigError::Invalid {
            field,
            value: value.to_string(),
            expected: "1..=100",
        });
    }
    Ok(())
}

fn validate_timeout_secs(field: &'static str, value: Option<u64>) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        return Err(ConfigError::Invalid {
            field,
            value: value.to_string(),
            expected: "1..=3600",
        });
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/harvester/config.toml`
/// 2. `$HOME/.config/harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Reads and validates a config file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed, or validated.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    FileConfig::from_toml_str(&raw, path)
}

/// Loads the config from an explicit path, or the default path if present.
///
/// An explicit path must exist; a missing default file yields `None`.
///
/// # Errors
///
/// Returns [`ConfigError`] if a file is found but cannot be loaded.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<FileConfig>, ConfigError> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading explicit config file");
        return load_file_config(path).map(Some);
    }

    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        debug!(path = %path.display(), "no config file at default path");
        return Ok(None);
    }

    debug!(path = %path.display(), "loading default config file");
    load_file_config(&path).map(Some)
}
