use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use sha2::{Digest, Sha256};

/// Static bearer check: the accepted token is the sha256 hex digest of the
/// shared secret, computed once at startup. No sessions, no expiry.
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            token: sha256_hex(secret),
        }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
        else {
            return false;
        };
        match value.strip_prefix("Bearer ") {
            Some(token) => token == self.token,
            None => false,
        }
    }
}

pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}
