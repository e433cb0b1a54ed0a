//! nimbus - command-line client for the Nimbus cloud
//!
//! Main entry point for the nimbus CLI.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use nimbus_auth::config::LISTEN_ADDR_ENV;
use nimbus_auth::{Locale, Messages, ProviderConfig};
use nimbus_config::{Profiles, SettingKey, Settings};

mod commands;

use commands::{auth, config};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// nimbus - command-line client for the Nimbus cloud
#[derive(Parser)]
#[command(name = "nimbus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Interface language (en-US, pt-BR)
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Profile to use instead of the active one
    #[arg(long, global = true, env = "NIMBUS_PROFILE")]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authentication management
    Auth(auth::AuthArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_root = nimbus_config::require_config_root()?;
    let profiles = Profiles::new(&config_root);
    let (profile, profile_dir) = profiles.ensure_active(cli.profile.as_deref())?;
    let settings = nimbus_config::load_settings(&profile_dir)?;

    // Console (stderr) plus rotating JSON file
    let base = settings
        .get(SettingKey::LogLevel)
        .map(|l| l.to_ascii_lowercase())
        .unwrap_or_else(|| "warn".to_string());
    let filter = if cli.verbose {
        "nimbus=debug,nimbus_auth=debug,nimbus_config=debug,info".to_string()
    } else {
        format!("nimbus={base},nimbus_auth={base},nimbus_config={base},warn")
    };

    let log_dir = nimbus_config::log_dir(&config_root);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "nimbus.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "nimbus=trace,nimbus_auth=trace,nimbus_config=trace,info",
                )),
        )
        .init();

    let locale = resolve_locale(cli.lang.as_deref(), &settings)?;
    tracing::debug!(profile = %profile, locale = locale.code(), "Starting");

    // Create context for commands
    let ctx = commands::Context {
        config_root,
        profile,
        profile_dir,
        provider: Arc::new(provider_config(&settings)),
        messages: Arc::new(Messages::for_locale(locale)),
        settings,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

/// `--lang`, then the `language` setting, then `LANG`, then English.
fn resolve_locale(flag: Option<&str>, settings: &Settings) -> Result<Locale> {
    if let Some(lang) = flag {
        return lang.parse().map_err(|e: String| anyhow::anyhow!(e));
    }

    if let Some(lang) = settings.get(SettingKey::Language) {
        match lang.parse() {
            Ok(locale) => return Ok(locale),
            Err(e) => tracing::warn!(error = %e, "Ignoring language setting"),
        }
    }

    Ok(std::env::var("LANG")
        .ok()
        .and_then(|v| Locale::from_env_value(&v))
        .unwrap_or_default())
}

/// Provider defaults, with the stored listen address when the environment doesn't set one.
fn provider_config(settings: &Settings) -> ProviderConfig {
    let config = ProviderConfig::default();
    let env_set = std::env::var(LISTEN_ADDR_ENV).is_ok_and(|v| !v.is_empty());
    match settings.get(SettingKey::ListenAddress) {
        Some(addr) if !env_set => config.with_listen_addr(addr),
        _ => config,
    }
}
