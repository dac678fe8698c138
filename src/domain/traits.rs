//! Domain traits defining contracts for external systems.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::error::{AppError, AuthError};
use super::types::Principal;

/// Database client trait for persistence operations
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Check database connectivity
    async fn health_check(&self) -> Result<(), AppError>;
}

/// Resolves a bearer token into the caller it was issued to.
///
/// Token issuance is outside this crate; implementations only verify.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Raw password must be provided")]
    MissingPassword,
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::MissingPassword => AppError::IllegalArgument(err.to_string()),
            PasswordError::Hash(_) => AppError::Unexpected(err.to_string()),
        }
    }
}

/// One-way password hashing.
pub trait PasswordEncoder: Send + Sync {
    /// Hash `raw`; an absent password is rejected.
    fn encode(&self, raw: Option<&str>) -> Result<String, PasswordError>;

    /// Whether `raw` hashes to `encoded`. Absent input or a malformed hash
    /// never matches.
    fn matches(&self, raw: Option<&str>, encoded: Option<&str>) -> bool;
}

/// Source of the current time for audit stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
