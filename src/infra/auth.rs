//! Static API-key token verifier.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::domain::{AuthError, Principal, TokenVerifier};

/// Role granted to every API-key principal.
pub const API_CLIENT_ROLE: &str = "API_CLIENT";

/// Constant-time comparison of two byte slices to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Accepts bearer tokens equal to one of the configured API keys.
///
/// Only SHA-256 digests of the keys are kept. Every candidate is compared on
/// each call so timing does not reveal which key was closest.
pub struct ApiKeyVerifier {
    keys: Vec<(String, [u8; 32])>,
}

impl ApiKeyVerifier {
    #[must_use]
    pub fn new(keys: &[(String, SecretString)]) -> Self {
        let keys: Vec<(String, [u8; 32])> = keys
            .iter()
            .map(|(subject, key)| (subject.clone(), Sha256::digest(key.expose_secret().as_bytes()).into()))
            .collect();
        Self { keys }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for ApiKeyVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let provided = Sha256::digest(token.as_bytes());

        let mut matched: Option<&str> = None;
        for (subject, expected) in &self.keys {
            if constant_time_eq(expected, provided.as_slice()) && matched.is_none() {
                matched = Some(subject.as_str());
            }
        }

        matched
            .map(|subject| Principal::new(subject).with_roles([API_CLIENT_ROLE]))
            .ok_or_else(|| AuthError::InvalidToken("unknown API key".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> ApiKeyVerifier {
        ApiKeyVerifier::new(&[
            ("alice".to_string(), SecretString::from("key-a")),
            ("bob".to_string(), SecretString::from("key-b")),
        ])
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[tokio::test]
    async fn test_known_key_resolves_subject() {
        let principal = verifier().verify("key-b").await.unwrap();
        assert_eq!(principal.subject, "bob");
        assert!(principal.has_role(API_CLIENT_ROLE));
    }

    #[tokio::test]
    async fn test_unknown_key_is_invalid_token() {
        assert!(matches!(
            verifier().verify("key-c").await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_verifier_rejects_everything() {
        let verifier = ApiKeyVerifier::new(&[]);
        assert!(verifier.is_empty());
        assert!(verifier.verify("anything").await.is_err());
    }
}
