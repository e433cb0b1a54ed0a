//! Auth command - authentication management.

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde::Serialize;

use nimbus_auth::{CredentialStore, LoginOptions, LoginService, OAuthClient, TokenClaims};

use super::Context;

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Log in through the browser
    Login(LoginArgs),

    /// Show authentication status
    Status,

    /// Print a usable access token, refreshing it if needed
    Token,

    /// Clear stored credentials
    Logout,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Log in without a local browser
    #[arg(long, conflicts_with = "qrcode")]
    pub headless: bool,

    /// Show a QR code to log in from another device
    #[arg(long)]
    pub qrcode: bool,

    /// Print the tokens after logging in
    #[arg(long)]
    pub show: bool,
}

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    profile: String,
    logged_in: bool,
    email: Option<String>,
    tenant: Option<String>,
    scopes: Vec<String>,
    expires_at: Option<String>,
    expired: Option<bool>,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login(login) => cmd_login(login, ctx).await,
        AuthCommand::Status => cmd_status(ctx).await,
        AuthCommand::Token => cmd_token(ctx).await,
        AuthCommand::Logout => cmd_logout(ctx).await,
    }
}

fn open_store(ctx: &Context) -> Result<CredentialStore> {
    let refresher = OAuthClient::for_refresh(ctx.provider.clone())?;
    Ok(CredentialStore::open(&ctx.profile_dir, Arc::new(refresher))?)
}

async fn cmd_login(args: LoginArgs, ctx: &Context) -> Result<()> {
    let messages = &ctx.messages;
    let options = LoginOptions {
        headless: args.headless,
        qr_code: args.qrcode,
        show: args.show,
    };

    // An unreadable credential file must fail before the browser round trip.
    let mut store = open_store(ctx)?;

    eprintln!("{}", messages.starting_login);

    let service = LoginService::new(ctx.provider.clone(), ctx.messages.clone());
    let token = service
        .login(options)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", messages.login_failed, e))?;

    store.store_tokens(&token)?;
    tracing::info!(profile = %ctx.profile, "Login stored");

    println!("{}", Style::new().green().apply_to(messages.login_succeeded));
    Ok(())
}

async fn cmd_status(ctx: &Context) -> Result<()> {
    let messages = &ctx.messages;
    let store = open_store(ctx)?;

    let claims = if store.is_logged_in() {
        match store.token_claims() {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::warn!(error = %e, "Stored access token is unreadable");
                None
            }
        }
    } else {
        None
    };

    if ctx.json_output {
        let output = status_output(ctx, store.is_logged_in(), claims.as_ref());
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if !store.is_logged_in() {
        println!("{}", messages.not_logged_in);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{} ({})", style(messages.logged_in).green().bold(), ctx.profile);
    println!("{}", dim.apply_to("─".repeat(40)));

    if let Some(claims) = claims {
        if !claims.email.is_empty() {
            println!("  {} {}", dim.apply_to("Email:"), claims.email);
        }
        if !claims.tenant_id.is_empty() {
            println!("  {} {}", dim.apply_to("Tenant:"), claims.tenant_id);
        }
        let scopes: Vec<&str> = claims.scopes().collect();
        if !scopes.is_empty() {
            println!("  {} {}", dim.apply_to("Scopes:"), scopes.join(" "));
        }
        if let Some(expires_at) = expires_at(&claims) {
            let expired = store.validate_token().is_err();
            let note = if expired {
                format!(" {}", Style::new().yellow().apply_to(messages.token_expired))
            } else {
                String::new()
            };
            println!(
                "  {} {}{}",
                dim.apply_to(format!("{}:", messages.expires)),
                expires_at,
                note
            );
        }
    }
    println!();

    Ok(())
}

async fn cmd_token(ctx: &Context) -> Result<()> {
    let mut store = open_store(ctx)?;
    match store.access_token().await {
        Some(token) => {
            println!("{}", token);
            Ok(())
        }
        None => anyhow::bail!("{}", ctx.messages.not_logged_in),
    }
}

async fn cmd_logout(ctx: &Context) -> Result<()> {
    let mut store = open_store(ctx)?;
    store.logout()?;
    tracing::info!(profile = %ctx.profile, "Credentials cleared");
    println!("{}", ctx.messages.logged_out);
    Ok(())
}

fn expires_at(claims: &TokenClaims) -> Option<String> {
    let exp = claims.exp?;
    chrono::DateTime::from_timestamp(exp, 0)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S %Z").to_string())
}

fn status_output(ctx: &Context, logged_in: bool, claims: Option<&TokenClaims>) -> StatusOutput {
    let now = chrono::Utc::now().timestamp();
    StatusOutput {
        profile: ctx.profile.clone(),
        logged_in,
        email: claims.map(|c| c.email.clone()).filter(|s| !s.is_empty()),
        tenant: claims.map(|c| c.tenant_id.clone()).filter(|s| !s.is_empty()),
        scopes: claims
            .map(|c| c.scopes().map(str::to_string).collect())
            .unwrap_or_default(),
        expires_at: claims
            .and_then(|c| c.exp)
            .and_then(|exp| chrono::DateTime::from_timestamp(exp, 0))
            .map(|t| t.to_rfc3339()),
        expired: claims.map(|c| c.is_expired_at(now, nimbus_auth::store::EXPIRY_MARGIN_SECS)),
    }
}
