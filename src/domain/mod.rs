//! Domain layer: error catalog, failure types, response envelopes and audit metadata.

pub mod audit;
pub mod error;
pub mod error_code;
pub mod response;
pub mod traits;
pub mod types;

pub use audit::{ANONYMOUS_ACTOR, Actor, AuditError, AuditTrail, Audited, AuditingListener, Timestamps};
pub use error::{
    AppError, AuthError, BusinessError, CONFLICT_SQL_STATES, ConfigError, ExternalError,
    RequestError, StorageError,
};
pub use error_code::{CodeDefinition, ExceptionCode, GlobalErrorCode};
pub use response::{ApiResponse, ErrorResponse, FieldError, RESPONSE_UTC_OFFSET_SECS, response_timestamp};
pub use traits::{Clock, DatabaseClient, PasswordEncoder, PasswordError, SystemClock, TokenVerifier};
pub use types::{EntityId, HealthResponse, HealthStatus, Principal};
