//! PKCE code verifier and S256 challenge (RFC 7636).

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{AuthError, Result};

/// Number of random bytes behind a verifier. Encodes to 43 characters.
const VERIFIER_LEN: usize = 32;

/// A PKCE code verifier.
///
/// One verifier is generated per login attempt and never reused. The challenge is a
/// pure function of the verifier value.
#[derive(Clone)]
pub struct CodeVerifier {
    value: String,
}

impl CodeVerifier {
    /// Generate a verifier from the operating system's random source.
    pub fn new() -> Result<Self> {
        let mut bytes = [0u8; VERIFIER_LEN];
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            AuthError::Config(format!("system random source unavailable: {}", e))
        })?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Build a verifier from caller-provided bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            value: URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    /// The verifier string sent as `code_verifier` at exchange time.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// `BASE64URL(SHA256(verifier))` without padding.
    pub fn challenge_s256(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(self.value.as_bytes()))
    }
}

impl std::fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeVerifier").finish_non_exhaustive()
    }
}
