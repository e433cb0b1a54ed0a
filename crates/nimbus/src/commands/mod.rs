//! CLI command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use nimbus_auth::{Messages, ProviderConfig};
use nimbus_config::Settings;

pub mod auth;
pub mod config;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Root of the config tree.
    pub config_root: PathBuf,
    /// Name of the active profile.
    pub profile: String,
    /// Directory of the active profile.
    pub profile_dir: PathBuf,
    /// Settings loaded from the active profile.
    pub settings: Settings,
    /// Identity provider configuration.
    pub provider: Arc<ProviderConfig>,
    /// Localized user-facing text.
    pub messages: Arc<Messages>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}
