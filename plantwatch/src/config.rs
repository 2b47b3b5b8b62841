//! Configuration file handling.
//!
//! Settings live in an INI file at `~/.plantwatch/config.ini`:
//!
//! ```ini
//! [service]
//! base_url = https://example.com/assets/
//! timeout = 30
//!
//! [refresh]
//! enabled = true
//!
//! [logging]
//! level = info
//! directory = /var/log/plantwatch
//! ```
//!
//! A missing file means defaults. Every value is validated through
//! [`ConfigKey::set`], both when loading a file and when setting a value
//! from the command line, so a loaded [`ConfigFile`] is always usable.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::logging::{is_valid_level, LoggingConfig, DEFAULT_LOG_LEVEL};
use crate::service::{HttpServiceConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// Name of the per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = ".plantwatch";

/// Name of the configuration file inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors that can occur while reading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("Config file I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid INI.
    #[error("Failed to parse config file: {0}")]
    Parse(String),

    /// A value failed validation.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The key is not a known `section.key` name.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Directory holding the configuration file.
///
/// Falls back to the current directory when no home directory is known.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Full path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// `[service]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Directory URL of the catalogue files.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[refresh]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Whether refreshes fetch from the catalogue at all.
    pub enabled: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Level for the workspace crates.
    pub level: String,
    /// Directory for rolling log files, if any.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub service: ServiceSettings,
    pub refresh: RefreshSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from [`config_file_path`], or defaults if the file is missing.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, or defaults if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse INI text. Keys that are not present keep their defaults.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }

        Ok(config)
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        debug!(path = %path.display(), "Saved config file");
        Ok(())
    }

    /// Render as INI. Unset optional values are omitted.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini
    }

    /// Settings for the HTTP catalogue client.
    pub fn service_config(&self) -> HttpServiceConfig {
        HttpServiceConfig::new(self.service.base_url.clone())
            .with_timeout(Duration::from_secs(self.service.timeout_secs))
    }

    /// Settings for [`crate::logging::init_logging`].
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::default()
            .with_level(self.logging.level.clone())
            .with_directory(self.logging.directory.clone())
    }
}

/// A settable configuration key, named `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ServiceBaseUrl,
    ServiceTimeout,
    RefreshEnabled,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ServiceBaseUrl,
            ConfigKey::ServiceTimeout,
            ConfigKey::RefreshEnabled,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingDirectory,
        ]
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::ServiceBaseUrl | ConfigKey::ServiceTimeout => "service",
            ConfigKey::RefreshEnabled => "refresh",
            ConfigKey::LoggingLevel | ConfigKey::LoggingDirectory => "logging",
        }
    }

    /// Key name within the section.
    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::ServiceBaseUrl => "base_url",
            ConfigKey::ServiceTimeout => "timeout",
            ConfigKey::RefreshEnabled => "enabled",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text. Empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::ServiceBaseUrl => config.service.base_url.clone(),
            ConfigKey::ServiceTimeout => config.service.timeout_secs.to_string(),
            ConfigKey::RefreshEnabled => config.refresh.enabled.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate `value` and store it in `config`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::ServiceBaseUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(self.invalid(value, "must start with http:// or https://"));
                }
                config.service.base_url = value.to_string();
            }
            ConfigKey::ServiceTimeout => {
                config.service.timeout_secs = match value.parse::<u64>() {
                    Ok(secs) if secs > 0 => secs,
                    _ => return Err(self.invalid(value, "must be a positive number of seconds")),
                };
            }
            ConfigKey::RefreshEnabled => {
                config.refresh.enabled = parse_bool(value)
                    .ok_or_else(|| self.invalid(value, "must be true or false"))?;
            }
            ConfigKey::LoggingLevel => {
                if !is_valid_level(value) {
                    return Err(self.invalid(value, "must be trace, debug, info, warn or error"));
                }
                config.logging.level = value.to_ascii_lowercase();
            }
            ConfigKey::LoggingDirectory => {
                config.logging.directory = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
