//! Config command - settings and profile management.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;

use nimbus_auth::Locale;
use nimbus_config::{Profiles, SettingKey};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the value of a setting
    Get {
        /// Setting name: language, listen_address, log_level
        key: String,
    },

    /// Change a setting in the active profile
    Set {
        /// Setting name: language, listen_address, log_level
        key: String,
        value: String,
    },

    /// Remove a setting from the active profile
    Unset {
        /// Setting name: language, listen_address, log_level
        key: String,
    },

    /// List every setting with its value
    List,

    /// Show the active profile's directory
    Path,

    /// List profiles
    Profiles,

    /// Switch to a different profile
    UseProfile {
        /// Profile name
        name: String,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Get { key } => cmd_get(&key, ctx),
        ConfigCommand::Set { key, value } => cmd_set(&key, &value, ctx),
        ConfigCommand::Unset { key } => cmd_unset(&key, ctx),
        ConfigCommand::List => cmd_list(ctx),
        ConfigCommand::Path => {
            println!("{}", ctx.profile_dir.display());
            Ok(())
        }
        ConfigCommand::Profiles => cmd_profiles(ctx),
        ConfigCommand::UseProfile { name } => cmd_use_profile(&name, ctx),
    }
}

fn cmd_get(key: &str, ctx: &Context) -> Result<()> {
    let key: SettingKey = key.parse()?;
    if let Some(value) = ctx.settings.get(key) {
        println!("{}", value);
    }
    Ok(())
}

fn cmd_set(key: &str, value: &str, ctx: &Context) -> Result<()> {
    let key: SettingKey = key.parse()?;
    let value = match key {
        // Only store languages there is a catalog for, in canonical form.
        SettingKey::Language => value
            .parse::<Locale>()
            .map_err(|e| anyhow::anyhow!(e))?
            .code()
            .to_string(),
        _ => value.to_string(),
    };
    let mut settings = ctx.settings.clone();
    settings.set(key, &value)?;
    nimbus_config::save_settings(&settings, &ctx.profile_dir)?;
    tracing::info!(key = %key, profile = %ctx.profile, "Setting changed");
    Ok(())
}

fn cmd_unset(key: &str, ctx: &Context) -> Result<()> {
    let key: SettingKey = key.parse()?;
    let mut settings = ctx.settings.clone();
    settings.unset(key);
    nimbus_config::save_settings(&settings, &ctx.profile_dir)?;
    Ok(())
}

fn cmd_list(ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&ctx.settings)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    for (key, value) in ctx.settings.entries() {
        match value {
            Some(value) => println!("{} = {}", key, value),
            None => println!("{} = {}", key, dim.apply_to("(unset)")),
        }
        if ctx.verbose {
            println!("  {}", dim.apply_to(key.description()));
        }
    }
    Ok(())
}

fn cmd_profiles(ctx: &Context) -> Result<()> {
    let profiles = Profiles::new(&ctx.config_root);
    let green = Style::new().green();
    for name in profiles.list()? {
        if name == ctx.profile {
            println!("{} {}", green.apply_to("*"), green.apply_to(&name));
        } else {
            println!("  {}", name);
        }
    }
    Ok(())
}

fn cmd_use_profile(name: &str, ctx: &Context) -> Result<()> {
    let profiles = Profiles::new(&ctx.config_root);
    profiles.set_current(name)?;
    println!("Switched to profile \"{}\"", name);
    Ok(())
}
