//! In-memory stand-ins for the collaborators behind the domain traits.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{
    AppError, AuthError, Clock, DatabaseClient, PasswordEncoder, PasswordError, Principal,
    StorageError, TokenVerifier,
};

/// Database whose health is flipped by the test.
///
/// ```
/// use grit_platform_server::domain::StorageError;
/// use grit_platform_server::test_utils::MockDatabaseClient;
///
/// let db = MockDatabaseClient::new();
/// db.set_healthy(false);
/// let broken = MockDatabaseClient::failing(StorageError::PoolTimedOut);
/// ```
#[derive(Debug)]
pub struct MockDatabaseClient {
    healthy: AtomicBool,
    health_checks: AtomicU64,
    failure: Option<StorageError>,
    latency: Option<std::time::Duration>,
}

impl MockDatabaseClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            health_checks: AtomicU64::new(0),
            failure: None,
            latency: None,
        }
    }

    /// Every health check fails with `error`, regardless of [`Self::set_healthy`].
    #[must_use]
    pub fn failing(error: StorageError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    /// Number of health checks answered so far.
    pub fn health_checks(&self) -> u64 {
        self.health_checks.load(Ordering::Relaxed)
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn health_check(&self) -> Result<(), AppError> {
        self.health_checks.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = &self.failure {
            return Err(error.clone().into());
        }
        if self.healthy.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(StorageError::Connection("connection refused".to_string()).into())
        }
    }
}

/// Token verifier answering from a fixed table.
///
/// Unknown tokens are rejected with [`AuthError::InvalidToken`].
#[derive(Default)]
pub struct MockTokenVerifier {
    tokens: Mutex<HashMap<String, Result<Principal, AuthError>>>,
}

impl MockTokenVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `subject`.
    #[must_use]
    pub fn with_principal(self, token: &str, subject: &str) -> Self {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), Ok(Principal::new(subject)));
        self
    }

    /// Reject `token` with `error`.
    #[must_use]
    pub fn with_failure(self, token: &str, error: AuthError) -> Self {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), Err(error));
        self
    }
}

#[async_trait]
impl TokenVerifier for MockTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .unwrap_or_else(|| Err(AuthError::InvalidToken("unknown token".to_string())))
    }
}

/// Cheap reversible encoder so tests don't pay for BCrypt rounds.
#[derive(Debug, Default)]
pub struct MockPasswordEncoder;

impl MockPasswordEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PasswordEncoder for MockPasswordEncoder {
    fn encode(&self, raw: Option<&str>) -> Result<String, PasswordError> {
        raw.map(|raw| format!("mock${raw}"))
            .ok_or(PasswordError::MissingPassword)
    }

    fn matches(&self, raw: Option<&str>, encoded: Option<&str>) -> bool {
        match (raw, encoded.and_then(|e| e.strip_prefix("mock$"))) {
            (Some(raw), Some(stored)) => raw == stored,
            _ => false,
        }
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_failing_database_reports_its_error() {
        let db = MockDatabaseClient::failing(StorageError::PoolTimedOut);
        assert!(matches!(
            db.health_check().await,
            Err(AppError::Storage(StorageError::PoolTimedOut))
        ));
    }

    #[tokio::test]
    async fn test_database_health_toggles() {
        let db = MockDatabaseClient::new();
        assert!(db.health_check().await.is_ok());

        db.set_healthy(false);
        assert!(matches!(
            db.health_check().await,
            Err(AppError::Storage(StorageError::Connection(_)))
        ));
        assert_eq!(db.health_checks(), 2);
    }

    #[tokio::test]
    async fn test_mock_token_verifier() {
        let verifier = MockTokenVerifier::new()
            .with_principal("good", "alice")
            .with_failure("old", AuthError::TokenExpired);

        assert_eq!(verifier.verify("good").await.unwrap().subject, "alice");
        assert_eq!(verifier.verify("old").await, Err(AuthError::TokenExpired));
        assert!(matches!(
            verifier.verify("nope").await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_mock_password_encoder() {
        let encoder = MockPasswordEncoder::new();
        let encoded = encoder.encode(Some("pw")).unwrap();
        assert!(encoder.matches(Some("pw"), Some(&encoded)));
        assert!(!encoder.matches(Some("pw"), Some("pw")));
        assert!(!encoder.matches(None, Some(&encoded)));
        assert_eq!(encoder.encode(None), Err(PasswordError::MissingPassword));
    }

    #[test]
    fn test_fixed_clock() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let shared = clock.clone();

        shared.advance(Duration::seconds(10));
        assert_eq!(clock.now(), start + Duration::seconds(10));

        clock.set(start);
        assert_eq!(shared.now(), start);
    }
}
