//! Infrastructure layer implementations.

pub mod auth;
pub mod database;
pub mod observability;
pub mod password;

pub use auth::ApiKeyVerifier;
pub use database::{PostgresClient, PostgresConfig};
pub use observability::{init_metrics, init_tracing};
pub use password::{PASSWORD_STRENGTH, PepperedPasswordEncoder};
