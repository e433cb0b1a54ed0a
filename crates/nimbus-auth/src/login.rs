//! Interactive login orchestration.

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::{AuthError, Result};
use crate::listener::CallbackListener;
use crate::messages::Messages;
use crate::oauth::{OAuthClient, TokenResponse};

/// Options for `nimbus auth login`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginOptions {
    /// Log in without a local browser (device flow).
    pub headless: bool,
    /// Show a QR code to finish the login on another device.
    pub qr_code: bool,
    /// Print the tokens after a successful login.
    pub show: bool,
}

/// The login flow selected by [`LoginOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginVariant {
    Browser { show_token: bool },
    Headless,
    QrCode,
}

impl LoginOptions {
    pub fn variant(&self) -> LoginVariant {
        if self.qr_code {
            LoginVariant::QrCode
        } else if self.headless {
            LoginVariant::Headless
        } else {
            LoginVariant::Browser {
                show_token: self.show,
            }
        }
    }
}

/// Opens URLs for the user.
pub trait BrowserOpener: Send + Sync + std::fmt::Debug {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Opens URLs in the system's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Runs login attempts against one provider.
#[derive(Debug, Clone)]
pub struct LoginService {
    config: Arc<ProviderConfig>,
    messages: Arc<Messages>,
    browser: Arc<dyn BrowserOpener>,
}

impl LoginService {
    pub fn new(config: Arc<ProviderConfig>, messages: Arc<Messages>) -> Self {
        Self {
            config,
            messages,
            browser: Arc::new(SystemBrowser),
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserOpener>) -> Self {
        self.browser = browser;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Run the login flow selected by `options`.
    pub async fn login(&self, options: LoginOptions) -> Result<TokenResponse> {
        match options.variant() {
            LoginVariant::Browser { show_token } => self.browser_login(show_token).await,
            LoginVariant::Headless => Err(AuthError::NotSupported("headless login")),
            LoginVariant::QrCode => Err(AuthError::NotSupported("QR code login")),
        }
    }

    async fn browser_login(&self, show_token: bool) -> Result<TokenResponse> {
        let client = OAuthClient::new(self.config.clone())?;
        let auth_url = client.authorization_url()?;

        let handle = CallbackListener::bind(
            self.config.clone(),
            Arc::new(client),
            self.messages.clone(),
        )
        .await?
        .start();

        eprintln!(
            "{} {}://{}",
            self.messages.opening_browser,
            auth_url.scheme(),
            auth_url.host_str().unwrap_or_default()
        );
        if let Err(e) = self.browser.open(auth_url.as_str()) {
            tracing::debug!(error = %e, "Failed to open browser");
            eprintln!("{}", self.messages.browser_failed);
            eprintln!("{} {}", self.messages.open_manually, auth_url);
        }
        eprintln!("{}", self.messages.waiting_callback);

        let token = handle.wait().await?;

        if show_token {
            println!();
            println!("{}: {}", self.messages.access_token, token.access_token);
            if !token.refresh_token.is_empty() {
                println!("{}: {}", self.messages.refresh_token, token.refresh_token);
            }
        }

        Ok(token)
    }
}
