//! Authorization URL construction and token endpoint calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ProviderConfig;
use crate::error::{AuthError, Result};
use crate::pkce::CodeVerifier;

/// Per-request timeout for token endpoint calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Query flag asking the provider to show its tenant picker.
const TENANT_SELECTION_PARAM: (&str, &str) = ("choose_tenants", "true");

/// Token endpoint response.
///
/// Values are opaque to this crate; signatures are never checked locally.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// The two grants the CLI performs against the token endpoint.
#[async_trait]
pub trait TokenExchange: Send + Sync + std::fmt::Debug {
    /// Redeem an authorization code, proving possession of the PKCE verifier.
    async fn exchange_code_for_token(&self, code: &str) -> Result<TokenResponse>;

    /// Obtain a fresh access token from a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse>;
}

/// Token endpoint client bound to one provider configuration.
///
/// A client created with [`OAuthClient::new`] owns the verifier for a single login
/// attempt; the same verifier feeds the authorization URL and the code exchange.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: Arc<ProviderConfig>,
    http: reqwest::Client,
    verifier: Option<CodeVerifier>,
}

impl OAuthClient {
    /// Create a client with a freshly generated verifier.
    pub fn new(config: Arc<ProviderConfig>) -> Result<Self> {
        let verifier = CodeVerifier::new()?;
        Ok(Self {
            config,
            http: default_http_client()?,
            verifier: Some(verifier),
        })
    }

    /// Create a client that can only refresh tokens.
    pub fn for_refresh(config: Arc<ProviderConfig>) -> Result<Self> {
        Ok(Self {
            config,
            http: default_http_client()?,
            verifier: None,
        })
    }

    /// Replace the verifier, e.g. with a known value.
    pub fn with_verifier(mut self, verifier: CodeVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn verifier(&self) -> Option<&CodeVerifier> {
        self.verifier.as_ref()
    }

    /// Build the browser URL that starts the authorization code flow.
    pub fn authorization_url(&self) -> Result<Url> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| AuthError::Config("code verifier not initialized".to_string()))?;
        build_authorization_url(&self.config, verifier)
    }

    async fn post_form(&self, params: &[(&str, &str)], grant: &str) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("failed to execute token request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(format!("failed to read response body: {}", e)))?;

        if status != StatusCode::OK {
            tracing::debug!(grant, status = status.as_u16(), "token endpoint rejected request");
            return Err(AuthError::Exchange(format!(
                "token request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| AuthError::Exchange(format!("failed to decode token response: {}", e)))
    }
}

#[async_trait]
impl TokenExchange for OAuthClient {
    async fn exchange_code_for_token(&self, code: &str) -> Result<TokenResponse> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| AuthError::Exchange("code verifier not initialized".to_string()))?;

        tracing::debug!("exchanging authorization code");
        self.post_form(
            &[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code", code),
                ("code_verifier", verifier.value()),
            ],
            "authorization_code",
        )
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        if refresh_token.is_empty() {
            return Err(AuthError::Refresh("refresh token is not set".to_string()));
        }

        tracing::debug!("refreshing access token");
        self.post_form(
            &[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("refresh_token", refresh_token),
            ],
            "refresh_token",
        )
        .await
    }
}

/// Build the authorization URL for `config` bound to `verifier`'s S256 challenge.
///
/// Parameters already present on the configured authorize URL are kept.
pub fn build_authorization_url(config: &ProviderConfig, verifier: &CodeVerifier) -> Result<Url> {
    let mut url = Url::parse(&config.authorize_url)
        .map_err(|e| AuthError::Config(format!("failed to parse auth URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("code_challenge", &verifier.challenge_s256())
        .append_pair("code_challenge_method", "S256")
        .append_pair("scope", &config.scope_string())
        .append_pair(TENANT_SELECTION_PARAM.0, TENANT_SELECTION_PARAM.1);

    Ok(url)
}

fn default_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {}", e)))
}
