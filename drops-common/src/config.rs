//! Bootstrap configuration and root folder resolution
//!
//! Only bootstrap concerns live in TOML (where the database is, how to log).
//! Everything the curation engine tunes at runtime lives in the database
//! `settings` table instead.
//!
//! Root folder priority:
//! 1. Command-line argument (highest priority)
//! 2. `DROPS_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "DROPS_ROOT_FOLDER";

/// Database file name used when the TOML file does not name one
pub const DEFAULT_DATABASE_FILE: &str = "drops.db";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional so that a missing or partial file still yields a
/// usable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database and log files
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Database path, relative to the root folder unless absolute
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse TOML config from a string
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the config from `path`, or from the platform default location
    ///
    /// A missing file is not an error: defaults are returned and a warning
    /// is logged. A file that exists but does not parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        match candidate {
            Some(p) if p.exists() => {
                debug!(path = %p.display(), "Loading TOML config");
                Self::load(&p)
            }
            Some(p) => {
                warn!(path = %p.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Resolve the database file location below `root_folder`
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        match &self.database_path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root_folder.join(p),
            None => root_folder.join(DEFAULT_DATABASE_FILE),
        }
    }
}

/// Resolve the root folder following CLI → ENV → TOML → default priority
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Create the root folder if it does not exist yet
pub fn ensure_root_folder(root_folder: &Path) -> Result<()> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder).map_err(|e| {
            Error::Config(format!(
                "Cannot create root folder {}: {}",
                root_folder.display(),
                e
            ))
        })?;
    }
    Ok(())
}

/// Platform config file location (`<config dir>/drops/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("drops").join("config.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("drops"))
        .unwrap_or_else(|| PathBuf::from("./drops_data"))
}
