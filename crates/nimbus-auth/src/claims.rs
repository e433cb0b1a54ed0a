//! Unverified access-token claims.
//!
//! The CLI only needs to know *when* its token expires and *who* it belongs to, so the
//! JWT payload is decoded without checking the signature. The provider remains the
//! authority on validity.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;

use crate::error::{AuthError, Result};

/// Claims read from the access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiration time, seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<i64>,
    /// Tenant identifier, prefixed with its type by the provider.
    #[serde(default, rename = "tenant")]
    pub tenant_id: String,
    /// Space-separated granted scopes.
    #[serde(default, rename = "scope")]
    pub scope: String,
    #[serde(default)]
    pub email: String,
}

impl TokenClaims {
    /// Decode the payload segment of a compact JWT.
    pub fn decode_unverified(token: &str) -> Result<Self> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Validation(
                "token is not a three-part JWT".to_string(),
            ));
        };

        // Some issuers pad their segments even though RFC 7515 forbids it.
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::Validation(format!("invalid token payload encoding: {}", e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::Validation(format!("invalid token claims: {}", e)))
    }

    /// Whether the token counts as expired at `now`, allowing `margin_secs` of slack.
    ///
    /// A token without an `exp` claim is always expired.
    pub fn is_expired_at(&self, now: i64, margin_secs: i64) -> bool {
        match self.exp {
            Some(exp) => exp < now - margin_secs,
            None => true,
        }
    }

    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }
}

/// Build an unsigned JWT carrying `claims`.
#[cfg(test)]
pub(crate) fn encode_unsigned(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}
