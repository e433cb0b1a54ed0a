//! Identity provider configuration.

use std::time::Duration;

/// Environment variable that overrides the callback listener address.
pub const LISTEN_ADDR_ENV: &str = "NIMBUS_LISTEN_ADDRESS";

/// Callback listener address used when nothing overrides it.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8095";

/// Upper bound on graceful listener shutdown before the listener is force-closed.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

const DEFAULT_SCOPES: &[&str] = &[
    "openid",
    "iam:read",
    "iam:write",
    "network.read",
    "network.write",
    "block-storage.read",
    "block-storage.write",
    "object-storage.read",
    "object-storage.write",
    "virtual-machine.read",
    "virtual-machine.write",
    "dbaas.read",
    "dbaas.write",
    "kubernetes.read",
    "kubernetes.write",
    "registry.read",
    "registry.write",
    "lbaas.read",
    "lbaas.write",
];

/// OAuth configuration for the nimbus identity provider.
///
/// Constructed once when a login starts and not mutated afterwards.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// Address the callback listener binds.
    pub listen_addr: String,
    pub shutdown_timeout: Duration,
    pub terms_url: String,
    pub privacy_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::nimbus()
    }
}

impl ProviderConfig {
    /// Production configuration. The listen address honours `NIMBUS_LISTEN_ADDRESS`.
    pub fn nimbus() -> Self {
        Self {
            client_id: "n1mbu5-cli-7Qe4xvR2bH9kLm0pZs3Tw8Yc".to_string(),
            authorize_url: "https://id.nimbus.cloud/login".to_string(),
            token_url: "https://id.nimbus.cloud/oauth/token".to_string(),
            redirect_uri: "http://localhost:8095/callback".to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            listen_addr: listen_addr_from_env(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            terms_url: "https://nimbus.cloud/legal/terms-of-use/".to_string(),
            privacy_url: "https://nimbus.cloud/legal/privacy-policy/".to_string(),
        }
    }

    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Scopes joined the way the authorize endpoint expects them.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

fn listen_addr_from_env() -> String {
    match std::env::var(LISTEN_ADDR_ENV) {
        Ok(addr) if !addr.trim().is_empty() => addr.trim().to_string(),
        _ => DEFAULT_LISTEN_ADDR.to_string(),
    }
}
