//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while resolving profiles and reading or writing settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a config file or create a directory.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No platform config directory and no override.
    #[error("could not determine config directory; set NIMBUS_CONFIG_DIR")]
    NoConfigDir,

    /// Profile name that cannot be used as a directory name.
    #[error("invalid profile name '{0}': use letters, digits, '-' and '_'")]
    InvalidProfile(String),

    /// Setting key outside the known table.
    #[error("unknown setting '{0}'")]
    UnknownSetting(String),

    /// Value rejected by a setting's validator.
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
