//! Application state management.
//!
//! This module provides the shared application state that is
//! accessible to all request handlers via Axum's State extractor.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::domain::{DatabaseClient, PasswordEncoder, TokenVerifier};

use super::config::HttpPolicy;
use super::service::AppService;

/// Shared application state for the Axum web server.
///
/// All contained collaborators are behind `Arc`, so cloning is cheap and the
/// state is safe to share across async tasks.
///
/// ```ignore
/// let state = AppState::new(verifier, encoder)
///     .with_database(db)
///     .with_policy(config.policy);
/// let router = create_router(Arc::new(state));
/// ```
#[derive(Clone)]
pub struct AppState {
    /// The application service.
    pub service: Arc<AppService>,

    /// Database client, when one is configured.
    pub db_client: Option<Arc<dyn DatabaseClient>>,

    /// Resolves bearer tokens into principals.
    pub token_verifier: Arc<dyn TokenVerifier>,

    pub password_encoder: Arc<dyn PasswordEncoder>,

    /// CORS, maintenance and limits applied by the router.
    pub policy: HttpPolicy,

    /// Prometheus handle rendered on `/metrics`.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Creates a new `AppState` without a database and with the default policy.
    #[must_use]
    pub fn new(
        token_verifier: Arc<dyn TokenVerifier>,
        password_encoder: Arc<dyn PasswordEncoder>,
    ) -> Self {
        let service = Arc::new(AppService::new(None, Arc::clone(&password_encoder)));

        Self {
            service,
            db_client: None,
            token_verifier,
            password_encoder,
            policy: HttpPolicy::default(),
            metrics: None,
        }
    }

    /// Attach a database. The service keeps its clock and encoder and
    /// starts reporting the database's health.
    #[must_use]
    pub fn with_database(mut self, db_client: Arc<dyn DatabaseClient>) -> Self {
        self.service = Arc::new(self.service.with_database(Arc::clone(&db_client)));
        self.db_client = Some(db_client);
        self
    }

    /// Replace the service, e.g. one built with a custom clock.
    #[must_use]
    pub fn with_service(mut self, service: Arc<AppService>) -> Self {
        self.service = service;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: HttpPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
