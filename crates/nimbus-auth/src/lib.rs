//! OAuth 2.0 authorization-code login with PKCE for the nimbus CLI.
//!
//! # Components
//!
//! - [`pkce`]: code verifier generation and S256 challenge
//! - [`oauth`]: authorization URL, code exchange and refresh against the token endpoint
//! - [`listener`]: single-use localhost server that receives the redirect
//! - [`login`]: orchestrates one interactive login attempt
//! - [`store`]: per-profile credential file with expiry checks and refresh
//! - [`claims`]: unverified JWT claim decoding
//! - [`messages`] / [`pages`]: localized text and the HTML shown after the redirect

pub mod claims;
pub mod config;
pub mod error;
pub mod listener;
pub mod login;
pub mod messages;
pub mod oauth;
pub mod pages;
pub mod pkce;
pub mod store;

pub use claims::TokenClaims;
pub use config::ProviderConfig;
pub use error::{AuthError, CancelReason, Result};
pub use listener::{AuthResult, CallbackListener, CancelHandle, ListenerHandle};
pub use login::{BrowserOpener, LoginOptions, LoginService, LoginVariant, SystemBrowser};
pub use messages::{Locale, Messages};
pub use oauth::{OAuthClient, TokenExchange, TokenResponse};
pub use pkce::CodeVerifier;
pub use store::{CredentialStore, StoredCredential};
