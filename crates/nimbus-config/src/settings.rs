//! Per-profile user settings stored in `config.toml`.
//!
//! ```toml
//! language = "pt-BR"
//! listen_address = "127.0.0.1:9000"
//! log_level = "debug"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Settings file name within a profile directory.
pub const SETTINGS_FILE: &str = "config.toml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// The settings `config get/set/list` know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Language,
    ListenAddress,
    LogLevel,
}

impl SettingKey {
    pub fn all() -> &'static [SettingKey] {
        &[
            SettingKey::Language,
            SettingKey::ListenAddress,
            SettingKey::LogLevel,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::Language => "language",
            SettingKey::ListenAddress => "listen_address",
            SettingKey::LogLevel => "log_level",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SettingKey::Language => "Interface language (en-US, pt-BR)",
            SettingKey::ListenAddress => "Address of the local login callback listener",
            SettingKey::LogLevel => "Console log level (trace, debug, info, warn, error)",
        }
    }

    fn validate(&self, value: &str) -> std::result::Result<(), String> {
        match self {
            SettingKey::Language => {
                let ok = !value.is_empty()
                    && value
                        .chars()
                        .all(|c| c.is_ascii_alphabetic() || c == '-' || c == '_');
                if ok {
                    Ok(())
                } else {
                    Err("expected a language tag such as en-US or pt-BR".to_string())
                }
            }
            SettingKey::ListenAddress => {
                let port = value.rsplit_once(':').map(|(host, port)| (host, port.parse::<u16>()));
                match port {
                    Some((host, Ok(_))) if !host.is_empty() => Ok(()),
                    _ => Err("expected host:port".to_string()),
                }
            }
            SettingKey::LogLevel => {
                if LOG_LEVELS.contains(&value.to_ascii_lowercase().as_str()) {
                    Ok(())
                } else {
                    Err(format!("expected one of {}", LOG_LEVELS.join(", ")))
                }
            }
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('-', "_");
        SettingKey::all()
            .iter()
            .copied()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| ConfigError::UnknownSetting(s.to_string()))
    }
}

/// Stored settings. Unset keys are omitted from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Settings {
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn get(&self, key: SettingKey) -> Option<&str> {
        self.slot(key).as_deref()
    }

    /// Validate and store `value` under `key`.
    pub fn set(&mut self, key: SettingKey, value: &str) -> Result<()> {
        let value = value.trim();
        key.validate(value).map_err(|reason| ConfigError::InvalidValue {
            key: key.name().to_string(),
            value: value.to_string(),
            reason,
        })?;
        *self.slot_mut(key) = Some(value.to_string());
        Ok(())
    }

    pub fn unset(&mut self, key: SettingKey) {
        *self.slot_mut(key) = None;
    }

    /// Every known key with its current value.
    pub fn entries(&self) -> Vec<(SettingKey, Option<&str>)> {
        SettingKey::all()
            .iter()
            .map(|k| (*k, self.get(*k)))
            .collect()
    }

    fn slot(&self, key: SettingKey) -> &Option<String> {
        match key {
            SettingKey::Language => &self.language,
            SettingKey::ListenAddress => &self.listen_address,
            SettingKey::LogLevel => &self.log_level,
        }
    }

    fn slot_mut(&mut self, key: SettingKey) -> &mut Option<String> {
        match key {
            SettingKey::Language => &mut self.language,
            SettingKey::ListenAddress => &mut self.listen_address,
            SettingKey::LogLevel => &mut self.log_level,
        }
    }
}

/// Path of the settings file for a profile directory.
pub fn settings_path(profile_dir: &Path) -> PathBuf {
    profile_dir.join(SETTINGS_FILE)
}

/// Load settings from a profile directory.
///
/// Returns defaults if the file doesn't exist.
pub fn load_settings(profile_dir: &Path) -> Result<Settings> {
    let path = settings_path(profile_dir);
    if !path.exists() {
        return Ok(Settings::default());
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Settings::from_toml(&contents)
}

/// Save settings into a profile directory.
pub fn save_settings(settings: &Settings, profile_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(profile_dir).map_err(|e| ConfigError::WriteFile {
        path: profile_dir.display().to_string(),
        source: e,
    })?;

    let path = settings_path(profile_dir);
    let contents = settings.to_toml()?;
    std::fs::write(&path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), "Settings saved");
    Ok(())
}
