//! Config root discovery.
//!
//! The root is `NIMBUS_CONFIG_DIR` when set and non-empty, otherwise
//! `<platform config dir>/nimbus` (`~/.config/nimbus` on Linux).

use std::path::PathBuf;

use crate::{ConfigError, Result};

/// Application name for platform directory resolution.
const APP_NAME: &str = "nimbus";

/// Environment variable that relocates the whole config tree.
pub const CONFIG_DIR_ENV: &str = "NIMBUS_CONFIG_DIR";

/// Subdirectory of the root that holds log files.
const LOG_DIR: &str = "logs";

/// Get the config root directory, if one can be determined.
pub fn config_root() -> Option<PathBuf> {
    root_from(std::env::var(CONFIG_DIR_ENV).ok(), dirs::config_dir())
}

/// Like [`config_root`] but fails when no directory can be determined.
pub fn require_config_root() -> Result<PathBuf> {
    config_root().ok_or(ConfigError::NoConfigDir)
}

/// Directory for rotated log files under `root`.
pub fn log_dir(root: &std::path::Path) -> PathBuf {
    root.join(LOG_DIR)
}

fn root_from(env_dir: Option<String>, platform_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(dir) = env_dir
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    platform_dir.map(|d| d.join(APP_NAME))
}
