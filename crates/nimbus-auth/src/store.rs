//! Persisted credentials for the active profile.
//!
//! One YAML file per profile directory holds the OAuth tokens plus the static API key
//! pair. Every mutation rewrites the whole file with owner-only permissions. There is no
//! cross-process locking: two CLI invocations writing at once can race.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::claims::TokenClaims;
use crate::error::{AuthError, Result};
use crate::oauth::{TokenExchange, TokenResponse};

/// Credential file name within a profile directory.
pub const CREDENTIAL_FILE: &str = "auth.yaml";

/// Slack applied to the access token's `exp` claim, in seconds.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// The on-disk credential record.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredCredential {
    pub access_key_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("access_key_id", &self.access_key_id)
            .field("has_access_token", &!self.access_token.is_empty())
            .field("has_refresh_token", &!self.refresh_token.is_empty())
            .finish_non_exhaustive()
    }
}

/// Owner of the credential file for one profile.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    credential: StoredCredential,
    refresher: Arc<dyn TokenExchange>,
    expiry_margin_secs: i64,
}

impl CredentialStore {
    /// Load the credential file from `profile_dir`. A missing file means "not logged in".
    pub fn open(profile_dir: &Path, refresher: Arc<dyn TokenExchange>) -> Result<Self> {
        Self::with_path(profile_dir.join(CREDENTIAL_FILE), refresher)
    }

    /// Load credentials from an explicit file path.
    pub fn with_path(path: PathBuf, refresher: Arc<dyn TokenExchange>) -> Result<Self> {
        let credential = load_credential(&path)?;
        Ok(Self {
            path,
            credential,
            refresher,
            expiry_margin_secs: EXPIRY_MARGIN_SECS,
        })
    }

    pub fn with_expiry_margin(mut self, secs: i64) -> Self {
        self.expiry_margin_secs = secs;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn credential(&self) -> &StoredCredential {
        &self.credential
    }

    pub fn is_logged_in(&self) -> bool {
        !self.credential.access_token.is_empty()
    }

    pub fn access_key_id(&self) -> &str {
        &self.credential.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.credential.secret_access_key
    }

    pub fn refresh_token(&self) -> &str {
        &self.credential.refresh_token
    }

    /// Return an access token fit for use, refreshing it once if it went stale.
    ///
    /// `None` means there is no token, or it was stale and the refresh failed. A stale
    /// token with no refresh token to renew it is returned as is.
    pub async fn access_token(&mut self) -> Option<String> {
        if self.credential.access_token.is_empty() {
            return None;
        }

        if let Err(e) = self.validate_token() {
            if self.credential.refresh_token.is_empty() {
                tracing::warn!(error = %e, "Access token is stale and there is no refresh token");
            } else {
                tracing::debug!(error = %e, "Access token is stale, refreshing");
                if let Err(e) = self.refresh().await {
                    tracing::warn!(error = %e, "Token refresh failed");
                    return None;
                }
            }
        }

        Some(self.credential.access_token.clone())
    }

    /// Decode the stored access token's claims without verifying its signature.
    pub fn token_claims(&self) -> Result<TokenClaims> {
        if self.credential.access_token.is_empty() {
            return Err(AuthError::Validation("access token is not set".to_string()));
        }
        TokenClaims::decode_unverified(&self.credential.access_token)
    }

    /// Fail if the access token cannot be decoded or has expired.
    pub fn validate_token(&self) -> Result<()> {
        let claims = self.token_claims()?;
        let now = chrono::Utc::now().timestamp();
        if claims.is_expired_at(now, self.expiry_margin_secs) {
            return Err(AuthError::Validation("token expired".to_string()));
        }
        Ok(())
    }

    /// Exchange the stored refresh token for new tokens and persist them.
    ///
    /// Stored tokens are only replaced after the exchange succeeded.
    pub async fn refresh(&mut self) -> Result<()> {
        let token = self
            .refresher
            .refresh_token(&self.credential.refresh_token)
            .await
            .map_err(|e| match e {
                AuthError::Refresh(_) => e,
                other => AuthError::Refresh(other.to_string()),
            })?;

        self.apply_tokens(&token);
        self.save()?;
        tracing::info!("Access token refreshed");
        Ok(())
    }

    /// Persist the tokens of a completed login.
    pub fn store_tokens(&mut self, token: &TokenResponse) -> Result<()> {
        self.credential.access_token = token.access_token.clone();
        self.credential.refresh_token = token.refresh_token.clone();
        self.save()
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) -> Result<()> {
        self.credential.access_token = token.into();
        self.save()
    }

    pub fn set_refresh_token(&mut self, token: impl Into<String>) -> Result<()> {
        self.credential.refresh_token = token.into();
        self.save()
    }

    pub fn set_access_key_id(&mut self, key: impl Into<String>) -> Result<()> {
        self.credential.access_key_id = key.into();
        self.save()
    }

    pub fn set_secret_access_key(&mut self, key: impl Into<String>) -> Result<()> {
        self.credential.secret_access_key = key.into();
        self.save()
    }

    /// Forget every stored credential.
    pub fn logout(&mut self) -> Result<()> {
        self.credential = StoredCredential::default();
        self.save()
    }

    fn apply_tokens(&mut self, token: &TokenResponse) {
        self.credential.access_token = token.access_token.clone();
        // Providers that don't rotate refresh tokens omit the field.
        if !token.refresh_token.is_empty() {
            self.credential.refresh_token = token.refresh_token.clone();
        }
    }

    fn save(&self) -> Result<()> {
        let storage_error = |source| AuthError::Storage {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(storage_error)?;
        }

        let yaml = serde_yaml::to_string(&self.credential).map_err(|e| {
            AuthError::Serialization(format!("failed to serialize credentials: {}", e))
        })?;
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(storage_error)?;

        // `mode` only applies on creation; tighten files that predate it before writing.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(storage_error)?;
        }

        file.write_all(yaml.as_bytes()).map_err(storage_error)?;

        tracing::debug!(path = %self.path.display(), "Credentials saved");
        Ok(())
    }
}

fn load_credential(path: &Path) -> Result<StoredCredential> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(StoredCredential::default());
        }
        Err(source) => {
            return Err(AuthError::Storage {
                path: path.display().to_string(),
                source,
            });
        }
    };

    if content.trim().is_empty() {
        return Ok(StoredCredential::default());
    }

    serde_yaml::from_str(&content).map_err(|e| {
        AuthError::Serialization(format!(
            "failed to parse credential file '{}': {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::encode_unsigned;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Debug)]
    struct MockRefresher {
        calls: AtomicUsize,
        response: Mutex<Option<TokenResponse>>,
    }

    impl MockRefresher {
        fn returning(token: Option<TokenResponse>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(token),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchange for MockRefresher {
        async fn exchange_code_for_token(&self, _code: &str) -> Result<TokenResponse> {
            Err(AuthError::Exchange("not used".to_string()))
        }

        async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if refresh_token.is_empty() {
                return Err(AuthError::Refresh("refresh token is not set".to_string()));
            }
            self.response
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AuthError::Exchange("token request failed with status 401: no".to_string()))
        }
    }

    fn jwt_expiring_in(secs: i64) -> String {
        let exp = chrono::Utc::now().timestamp() + secs;
        encode_unsigned(&serde_json::json!({
            "exp": exp,
            "tenant": "tenant:1",
            "scope": "openid",
            "email": "dev@example.com"
        }))
    }

    fn refreshed(access: &str, refresh: &str) -> TokenResponse {
        TokenResponse {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            scope: "openid".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_not_logged_in() {
        let temp = tempdir().unwrap();
        let store = CredentialStore::open(temp.path(), MockRefresher::returning(None)).unwrap();
        assert!(!store.is_logged_in());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_access_token_round_trips() {
        let temp = tempdir().unwrap();
        let refresher = MockRefresher::returning(None);
        let mut store = CredentialStore::open(temp.path(), refresher.clone()).unwrap();
        store.set_access_token("abc").unwrap();

        let reloaded = CredentialStore::open(temp.path(), refresher).unwrap();
        assert_eq!(reloaded.credential().access_token, "abc");
    }

    #[test]
    fn test_all_fields_persist() {
        let temp = tempdir().unwrap();
        let refresher = MockRefresher::returning(None);
        let mut store = CredentialStore::open(temp.path(), refresher.clone()).unwrap();
        store.set_access_token("a").unwrap();
        store.set_refresh_token("r").unwrap();
        store.set_access_key_id("key-id").unwrap();
        store.set_secret_access_key("secret").unwrap();

        let reloaded = CredentialStore::open(temp.path(), refresher).unwrap();
        assert_eq!(
            reloaded.credential(),
            &StoredCredential {
                access_key_id: "key-id".to_string(),
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
                secret_access_key: "secret".to_string(),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let mut store = CredentialStore::open(temp.path(), MockRefresher::returning(None)).unwrap();
        store.set_access_token("abc").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_world_readable_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let path = temp.path().join(CREDENTIAL_FILE);
        std::fs::write(&path, "access_token: old\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut store = CredentialStore::open(temp.path(), MockRefresher::returning(None)).unwrap();
        store.set_access_token("new").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let reloaded = CredentialStore::open(temp.path(), MockRefresher::returning(None)).unwrap();
        assert_eq!(reloaded.credential().access_token, "new");
    }

    #[test]
    fn test_logout_clears_everything() {
        let temp = tempdir().unwrap();
        let refresher = MockRefresher::returning(None);
        let mut store = CredentialStore::open(temp.path(), refresher.clone()).unwrap();
        store.store_tokens(&refreshed("a", "r")).unwrap();
        store.set_access_key_id("key-id").unwrap();

        store.logout().unwrap();
        assert!(!store.is_logged_in());

        let reloaded = CredentialStore::open(temp.path(), refresher).unwrap();
        assert_eq!(reloaded.credential(), &StoredCredential::default());
    }

    #[test]
    fn test_empty_and_partial_files_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(CREDENTIAL_FILE);

        std::fs::write(&path, "").unwrap();
        let store = CredentialStore::with_path(path.clone(), MockRefresher::returning(None)).unwrap();
        assert!(!store.is_logged_in());

        std::fs::write(&path, "access_token: tok\n").unwrap();
        let store = CredentialStore::with_path(path.clone(), MockRefresher::returning(None)).unwrap();
        assert_eq!(store.credential().access_token, "tok");
        assert!(store.refresh_token().is_empty());

        std::fs::write(&path, "access_token: [unclosed").unwrap();
        let err = CredentialStore::with_path(path, MockRefresher::returning(None)).unwrap_err();
        assert!(matches!(err, AuthError::Serialization(_)));
    }

    #[test]
    fn test_validate_token_expiry() {
        let temp = tempdir().unwrap();
        let mut store = CredentialStore::open(temp.path(), MockRefresher::returning(None)).unwrap();

        store.set_access_token(jwt_expiring_in(-120)).unwrap();
        assert!(matches!(store.validate_token(), Err(AuthError::Validation(_))));

        store.set_access_token(jwt_expiring_in(3600)).unwrap();
        assert!(store.validate_token().is_ok());

        store.set_access_token("not-a-jwt").unwrap();
        assert!(store.validate_token().is_err());
    }

    #[test]
    fn test_token_claims() {
        let temp = tempdir().unwrap();
        let mut store = CredentialStore::open(temp.path(), MockRefresher::returning(None)).unwrap();
        assert!(store.token_claims().is_err());

        store.set_access_token(jwt_expiring_in(3600)).unwrap();
        let claims = store.token_claims().unwrap();
        assert_eq!(claims.email, "dev@example.com");
        assert_eq!(claims.tenant_id, "tenant:1");
    }

    #[tokio::test]
    async fn test_access_token_empty_when_not_logged_in() {
        let temp = tempdir().unwrap();
        let refresher = MockRefresher::returning(Some(refreshed("new", "r2")));
        let mut store = CredentialStore::open(temp.path(), refresher.clone()).unwrap();
        assert_eq!(store.access_token().await, None);
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_fresh_token_is_returned_without_refresh() {
        let temp = tempdir().unwrap();
        let refresher = MockRefresher::returning(Some(refreshed("new", "r2")));
        let mut store = CredentialStore::open(temp.path(), refresher.clone()).unwrap();
        let token = jwt_expiring_in(3600);
        store.store_tokens(&refreshed(&token, "r1")).unwrap();

        assert_eq!(store.access_token().await, Some(token));
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_token_refreshes_once_and_persists() {
        let temp = tempdir().unwrap();
        let refresher = MockRefresher::returning(Some(refreshed("new", "r2")));
        let mut store = CredentialStore::open(temp.path(), refresher.clone()).unwrap();
        store.store_tokens(&refreshed(&jwt_expiring_in(-120), "r1")).unwrap();

        assert_eq!(store.access_token().await.as_deref(), Some("new"));
        assert_eq!(refresher.calls(), 1);

        let reloaded = CredentialStore::open(temp.path(), refresher).unwrap();
        assert_eq!(reloaded.credential().access_token, "new");
        assert_eq!(reloaded.refresh_token(), "r2");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stored_tokens() {
        let temp = tempdir().unwrap();
        let refresher = MockRefresher::returning(None);
        let mut store = CredentialStore::open(temp.path(), refresher.clone()).unwrap();
        let stale = jwt_expiring_in(-120);
        store.store_tokens(&refreshed(&stale, "r1")).unwrap();

        assert_eq!(store.access_token().await, None);
        assert_eq!(refresher.calls(), 1);
        assert_eq!(store.credential().access_token, stale);
        assert_eq!(store.refresh_token(), "r1");

        let err = store.refresh().await.unwrap_err();
        assert!(matches!(err, AuthError::Refresh(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_refresh_without_rotation_keeps_refresh_token() {
        let temp = tempdir().unwrap();
        let refresher = MockRefresher::returning(Some(refreshed("new", "")));
        let mut store = CredentialStore::open(temp.path(), refresher).unwrap();
        store.store_tokens(&refreshed("old", "r1")).unwrap();

        store.refresh().await.unwrap();
        assert_eq!(store.credential().access_token, "new");
        assert_eq!(store.refresh_token(), "r1");
    }

    #[tokio::test]
    async fn test_stale_token_without_refresh_token_is_returned() {
        let temp = tempdir().unwrap();
        let refresher = MockRefresher::returning(Some(refreshed("new", "r2")));
        let mut store = CredentialStore::open(temp.path(), refresher.clone()).unwrap();
        let stale = jwt_expiring_in(-120);
        store.set_access_token(stale.clone()).unwrap();

        assert_eq!(store.access_token().await, Some(stale));
        assert_eq!(refresher.calls(), 0);
    }
}
