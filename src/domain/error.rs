//! Application error types with proper error chaining.
//!
//! Every failure a request can end with is a variant of [`AppError`]. The API
//! layer translates each one into exactly one catalog entry; nothing here
//! knows about HTTP beyond the catalog's status codes.

use std::borrow::Cow;

use thiserror::Error;

use super::error_code::{CodeDefinition, ExceptionCode};
use super::response::FieldError;

/// SQL states reported for integrity-constraint and serialization conflicts.
pub const CONFLICT_SQL_STATES: [&str; 2] = ["23000", "40001"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Integrity constraint violated: {0}")]
    IntegrityViolation(String),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Optimistic lock failed: {0}")]
    OptimisticLock(String),
    #[error("SQL error (state {}): {message}", .state.as_deref().unwrap_or("unknown"))]
    Sql {
        state: Option<String>,
        message: String,
    },
    #[error("Entity not found: {0}")]
    EntityNotFound(String),
    #[error("Invalid property reference: {0}")]
    PropertyReference(String),
    #[error("Connection pool timed out")]
    PoolTimedOut,
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Data access failed: {0}")]
    DataAccess(String),
}

impl StorageError {
    /// Classifies a driver-reported database error.
    #[must_use]
    pub fn from_database(kind: sqlx::error::ErrorKind, state: Option<&str>, message: &str) -> Self {
        use sqlx::error::ErrorKind;

        match kind {
            ErrorKind::UniqueViolation => Self::DuplicateKey(message.to_string()),
            ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => Self::IntegrityViolation(message.to_string()),
            _ => Self::Sql {
                state: state.map(str::to_string),
                message: message.to_string(),
            },
        }
    }

    /// True for raw SQL failures whose state denotes a version conflict.
    #[must_use]
    pub fn is_serialization_conflict(&self) -> bool {
        matches!(self, Self::Sql { state: Some(state), .. } if CONFLICT_SQL_STATES.contains(&state.as_str()))
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::EntityNotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut => Self::PoolTimedOut,
            sqlx::Error::ColumnNotFound(column) => Self::PropertyReference(column),
            sqlx::Error::Io(io) => Self::Connection(io.to_string()),
            sqlx::Error::Tls(tls) => Self::Connection(tls.to_string()),
            sqlx::Error::Database(db_err) => {
                Self::from_database(db_err.kind(), db_err.code().as_deref(), db_err.message())
            }
            other => Self::DataAccess(other.to_string()),
        }
    }
}

/// Authentication and authorization failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Authentication token was not provided")]
    MissingToken,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token has expired")]
    TokenExpired,
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Bad credentials")]
    BadCredentials,
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Insufficient authentication")]
    InsufficientAuthentication,
    #[error("Account is disabled")]
    Disabled,
    #[error("Account is locked")]
    Locked,
}

/// Failures binding the incoming request to handler arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Unreadable request body: {0}")]
    InvalidBody(String),
    #[error("Missing request parameter: {0}")]
    MissingParameter(String),
    #[error("Argument type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Request payload too large")]
    PayloadTooLarge,
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("No endpoint for {0}")]
    EndpointNotFound(String),
    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },
}

/// Failures calling other HTTP services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalError {
    #[error("External API call failed: {0}")]
    Http(String),
    #[error("Could not connect to external system: {0}")]
    Connect(String),
    #[error("External call timed out: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for ExternalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<&str> for ConfigError {
    fn from(s: &str) -> Self {
        ConfigError::ParseError(s.to_string())
    }
}

/// Failure raised by application code that already knows its catalog entry.
///
/// The dispatcher answers it with the carried entry and message verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BusinessError {
    code: CodeDefinition,
    message: Cow<'static, str>,
}

impl BusinessError {
    /// Raise `code` with its default message.
    pub fn new<C: ExceptionCode + ?Sized>(code: &C) -> Self {
        Self {
            code: CodeDefinition::of(code),
            message: Cow::Borrowed(code.message()),
        }
    }

    pub fn with_message<C: ExceptionCode + ?Sized>(code: &C, message: impl Into<String>) -> Self {
        Self {
            code: CodeDefinition::of(code),
            message: Cow::Owned(message.into()),
        }
    }

    #[must_use]
    pub fn code(&self) -> CodeDefinition {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Business(#[from] BusinessError),
    #[error("Business rule violated: {0}")]
    BusinessRuleViolation(String),
    #[error("Maintenance mode: {0}")]
    MaintenanceMode(String),
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },
    #[error("Request binding failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("Constraint violated for {} field(s)", .0.len())]
    ConstraintViolation(Vec<FieldError>),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    External(#[from] ExternalError),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),
    #[error("Illegal state: {0}")]
    IllegalState(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Service overloaded")]
    Overloaded,
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Raise a catalog entry with its default message.
    pub fn business<C: ExceptionCode + ?Sized>(code: &C) -> Self {
        Self::Business(BusinessError::new(code))
    }

    /// Field errors attached to validation failures.
    #[must_use]
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::Validation(errors) | Self::ConstraintViolation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Message chosen by the code that raised the failure, if any.
    #[must_use]
    pub fn carried_message(&self) -> Option<&str> {
        match self {
            Self::Business(err) => Some(err.message()),
            Self::BusinessRuleViolation(message) | Self::MaintenanceMode(message) => Some(message),
            _ => None,
        }
    }

    /// Catalog entry chosen by the code that raised the failure, if any.
    #[must_use]
    pub fn carried_code(&self) -> Option<CodeDefinition> {
        match self {
            Self::Business(err) => Some(err.code()),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(StorageError::from(err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::External(ExternalError::from(err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(FieldError::from_validation(&err))
    }
}
