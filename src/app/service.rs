//! Application service layer.
//!
//! Orchestrates the infrastructure collaborators behind their traits:
//! dependency health, password hashing and audit stamping.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::domain::{
    Actor, AppError, Audited, AuditingListener, Clock, DatabaseClient, HealthResponse,
    HealthStatus, PasswordEncoder, SystemClock,
};

/// Application service shared by every handler.
pub struct AppService {
    db_client: Option<Arc<dyn DatabaseClient>>,
    password_encoder: Arc<dyn PasswordEncoder>,
    auditing: AuditingListener<Arc<dyn Clock>>,
}

impl AppService {
    /// Creates a new `AppService` stamping audit fields with the system clock.
    #[must_use]
    pub fn new(
        db_client: Option<Arc<dyn DatabaseClient>>,
        password_encoder: Arc<dyn PasswordEncoder>,
    ) -> Self {
        Self::with_clock(db_client, password_encoder, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        db_client: Option<Arc<dyn DatabaseClient>>,
        password_encoder: Arc<dyn PasswordEncoder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db_client,
            password_encoder,
            auditing: AuditingListener::new(clock),
        }
    }

    /// The same service reporting on `db_client`. Clock and encoder are kept.
    #[must_use]
    pub fn with_database(&self, db_client: Arc<dyn DatabaseClient>) -> Self {
        Self {
            db_client: Some(db_client),
            password_encoder: Arc::clone(&self.password_encoder),
            auditing: self.auditing.clone(),
        }
    }

    /// Performs a health check on the configured dependencies.
    ///
    /// The database is reported only when one is configured.
    #[instrument(skip(self))]
    pub async fn health_check(&self, maintenance: bool) -> HealthResponse {
        let database = match &self.db_client {
            Some(db) => Some(match db.health_check().await {
                Ok(()) => HealthStatus::Healthy,
                Err(e) => {
                    warn!(error = ?e, "Database health check failed");
                    HealthStatus::Unhealthy
                }
            }),
            None => None,
        };

        HealthResponse::new(database, maintenance)
    }

    /// Hash a raw password for storage.
    ///
    /// BCrypt is CPU-bound, so the encoder runs on the blocking pool.
    #[instrument(skip_all)]
    pub async fn encode_password(&self, raw: Option<&str>) -> Result<String, AppError> {
        let encoder = Arc::clone(&self.password_encoder);
        let raw = raw.map(str::to_owned);
        let encoded = tokio::task::spawn_blocking(move || encoder.encode(raw.as_deref()))
            .await
            .map_err(|e| AppError::Unexpected(format!("password hashing task failed: {e}")))??;
        Ok(encoded)
    }

    /// Check a raw password against a stored hash on the blocking pool.
    #[instrument(skip_all)]
    pub async fn password_matches(
        &self,
        raw: Option<&str>,
        encoded: Option<&str>,
    ) -> Result<bool, AppError> {
        let encoder = Arc::clone(&self.password_encoder);
        let raw = raw.map(str::to_owned);
        let encoded = encoded.map(str::to_owned);
        tokio::task::spawn_blocking(move || encoder.matches(raw.as_deref(), encoded.as_deref()))
            .await
            .map_err(|e| AppError::Unexpected(format!("password check task failed: {e}")))
    }

    /// Stamp `entity` before it is written: creation fields on the first
    /// write, modification fields afterwards.
    pub fn stamp<T>(&self, entity: &mut Audited<T>, actor: &Actor) {
        self.auditing.on_persist(entity, actor);
    }

    pub fn auditing(&self) -> &AuditingListener<Arc<dyn Clock>> {
        &self.auditing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PasswordError;
    use crate::infra::PepperedPasswordEncoder;
    use crate::test_utils::{FixedClock, MockDatabaseClient, MockPasswordEncoder};
    use chrono::{Duration, TimeZone, Utc};
    use secrecy::SecretString;
    use std::time::{Duration as StdDuration, Instant};

    fn service(db: Option<Arc<dyn DatabaseClient>>) -> AppService {
        AppService::new(db, Arc::new(MockPasswordEncoder::new()))
    }

    #[tokio::test]
    async fn test_health_check_without_database() {
        let health = service(None).health_check(false).await;

        assert_eq!(health.status, HealthStatus::Healthy);
        assert!(health.database.is_none());
    }

    #[tokio::test]
    async fn test_health_check_all_healthy() {
        let db = Arc::new(MockDatabaseClient::new());
        let health = service(Some(db.clone())).health_check(false).await;

        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.database, Some(HealthStatus::Healthy));
        assert_eq!(db.health_checks(), 1);
    }

    #[tokio::test]
    async fn test_health_check_database_unhealthy() {
        let db = Arc::new(MockDatabaseClient::new());
        db.set_healthy(false);
        let health = service(Some(db)).health_check(false).await;

        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.database, Some(HealthStatus::Unhealthy));
    }

    #[tokio::test]
    async fn test_health_check_in_maintenance() {
        let health = service(None).health_check(true).await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(health.maintenance);
    }

    #[tokio::test]
    async fn test_encode_password_rejects_missing_input() {
        let err = service(None).encode_password(None).await.unwrap_err();
        assert!(matches!(err, AppError::IllegalArgument(_)));
    }

    #[tokio::test]
    async fn test_password_round_trip_through_service() {
        let service = service(None);
        let encoded = service.encode_password(Some("secret")).await.unwrap();

        assert!(service.password_matches(Some("secret"), Some(&encoded)).await.unwrap());
        assert!(!service.password_matches(Some("other"), Some(&encoded)).await.unwrap());
        assert!(!service.password_matches(None, Some(&encoded)).await.unwrap());
    }

    #[tokio::test]
    async fn test_peppered_bcrypt_through_service() {
        let encoder = PepperedPasswordEncoder::new(SecretString::from("pepper")).with_cost(4);
        let service = AppService::new(None, Arc::new(encoder));

        let encoded = service.encode_password(Some("hunter2")).await.unwrap();
        assert!(encoded.starts_with("$2b$04$"));
        assert!(service.password_matches(Some("hunter2"), Some(&encoded)).await.unwrap());
    }

    /// Encoder that holds its thread, standing in for a high BCrypt cost.
    struct SlowEncoder;

    impl PasswordEncoder for SlowEncoder {
        fn encode(&self, raw: Option<&str>) -> Result<String, PasswordError> {
            std::thread::sleep(StdDuration::from_millis(200));
            raw.map(str::to_owned).ok_or(PasswordError::MissingPassword)
        }

        fn matches(&self, raw: Option<&str>, encoded: Option<&str>) -> bool {
            std::thread::sleep(StdDuration::from_millis(200));
            raw.is_some() && raw == encoded
        }
    }

    #[tokio::test]
    async fn test_hashing_does_not_stall_the_runtime() {
        // Single-threaded runtime: the ticker only runs if hashing is off-thread.
        let service = AppService::new(None, Arc::new(SlowEncoder));
        let started = Instant::now();

        let (encoded, ticked_at) = tokio::join!(service.encode_password(Some("pw")), async {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
            started.elapsed()
        });

        assert_eq!(encoded.unwrap(), "pw");
        assert!(ticked_at < StdDuration::from_millis(150), "{ticked_at:?}");
        assert!(started.elapsed() >= StdDuration::from_millis(200));
    }

    #[test]
    fn test_stamp_uses_injected_clock() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let service = AppService::with_clock(
            None,
            Arc::new(MockPasswordEncoder::new()),
            Arc::new(clock.clone()),
        );

        let mut entity = Audited::new("payload");
        service.stamp(&mut entity, &Actor::User("alice".to_string()));
        clock.advance(Duration::hours(1));
        service.stamp(&mut entity, &Actor::Anonymous);

        let audit = entity.audit().unwrap();
        assert_eq!(audit.created_at(), start);
        assert_eq!(audit.created_by(), "alice");
        assert_eq!(audit.updated_at(), start + Duration::hours(1));
        assert_eq!(audit.updated_by(), "anonymous");
    }
}
