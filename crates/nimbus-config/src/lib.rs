//! Configuration for the nimbus CLI.
//!
//! Layout under the config root (`NIMBUS_CONFIG_DIR` or `~/.config/nimbus`):
//!
//! ```text
//! current                     name of the active profile
//! logs/                       rotated JSON logs
//! profiles/<name>/auth.yaml   credentials (owned by nimbus-auth)
//! profiles/<name>/config.toml user settings
//! ```

pub mod discovery;
pub mod error;
pub mod profile;
pub mod settings;

pub use discovery::{CONFIG_DIR_ENV, config_root, log_dir, require_config_root};
pub use error::{ConfigError, Result};
pub use profile::{DEFAULT_PROFILE, PROFILE_ENV, Profiles, validate_name};
pub use settings::{SettingKey, Settings, load_settings, save_settings, settings_path};
