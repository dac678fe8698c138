//! Error taxonomy: the catalog of named error kinds.
//!
//! Each entry carries the HTTP status it is answered with, a stable machine
//! code of the form `<Category><Status>-<Seq>` (e.g. `C400-01`) that clients
//! may match on, and a default human-readable message.

use axum::http::StatusCode;

/// Contract shared by every error catalog.
///
/// [`GlobalErrorCode`] is the process-wide catalog. Feature modules can define
/// their own enums and implement this trait to raise [`BusinessError`]s with
/// their own codes.
///
/// [`BusinessError`]: crate::domain::BusinessError
pub trait ExceptionCode {
    fn status(&self) -> StatusCode;
    fn code(&self) -> &'static str;
    fn message(&self) -> &'static str;
}

/// A resolved catalog entry, detached from the enum that defined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeDefinition {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: &'static str,
}

impl CodeDefinition {
    #[must_use]
    pub const fn new(status: StatusCode, code: &'static str, message: &'static str) -> Self {
        Self {
            status,
            code,
            message,
        }
    }

    /// Snapshot any catalog entry.
    #[must_use]
    pub fn of<C: ExceptionCode + ?Sized>(code: &C) -> Self {
        Self::new(code.status(), code.code(), code.message())
    }
}

impl ExceptionCode for CodeDefinition {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn code(&self) -> &'static str {
        self.code
    }

    fn message(&self) -> &'static str {
        self.message
    }
}

/// Global error catalog shared by every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalErrorCode {
    // Client errors (400)
    InvalidRequestParameter,
    InvalidRequestBody,
    MissingRequiredField,
    InvalidInputFormat,
    DataIntegrityViolation,
    RequestSizeExceeded,
    UnsupportedMediaType,

    // Authentication (401)
    UnauthorizedResourceOwner,
    InvalidToken,
    TokenExpired,
    InvalidCredentials,
    MissingToken,
    TokenSignatureInvalid,

    // Authorization (403)
    InvalidResourceOwner,
    InsufficientPermissions,
    AccessLimitExceeded,

    // Resources (404)
    NotFoundResource,
    EndpointNotFound,

    // Method (405)
    InvalidRequestMethod,

    // Conflicts (409)
    ResourceConflict,
    ConcurrentModification,
    VersionConflict,
    DuplicateResource,

    // Semantic validation (422)
    UnprocessableRequest,
    ValidationFailed,
    BusinessRuleViolation,

    // Server errors (500)
    ServerError,
    DatabaseError,
    ExternalApiError,
    UnexpectedError,
    FileProcessingError,
    IntegrationError,

    // Unavailable (503)
    ServiceUnavailableNow,
    MaintenanceMode,
    RateLimitExceeded,

    // Gateway (504)
    Timeout,
}

impl GlobalErrorCode {
    /// Every entry, in declaration order.
    pub const ALL: [GlobalErrorCode; 36] = [
        Self::InvalidRequestParameter,
        Self::InvalidRequestBody,
        Self::MissingRequiredField,
        Self::InvalidInputFormat,
        Self::DataIntegrityViolation,
        Self::RequestSizeExceeded,
        Self::UnsupportedMediaType,
        Self::UnauthorizedResourceOwner,
        Self::InvalidToken,
        Self::TokenExpired,
        Self::InvalidCredentials,
        Self::MissingToken,
        Self::TokenSignatureInvalid,
        Self::InvalidResourceOwner,
        Self::InsufficientPermissions,
        Self::AccessLimitExceeded,
        Self::NotFoundResource,
        Self::EndpointNotFound,
        Self::InvalidRequestMethod,
        Self::ResourceConflict,
        Self::ConcurrentModification,
        Self::VersionConflict,
        Self::DuplicateResource,
        Self::UnprocessableRequest,
        Self::ValidationFailed,
        Self::BusinessRuleViolation,
        Self::ServerError,
        Self::DatabaseError,
        Self::ExternalApiError,
        Self::UnexpectedError,
        Self::FileProcessingError,
        Self::IntegrationError,
        Self::ServiceUnavailableNow,
        Self::MaintenanceMode,
        Self::RateLimitExceeded,
        Self::Timeout,
    ];

    /// Status, machine code and default message of this entry.
    #[must_use]
    pub const fn definition(self) -> CodeDefinition {
        use StatusCode as S;

        let (status, code, message) = match self {
            Self::InvalidRequestParameter => (S::BAD_REQUEST, "C400-01", "Invalid request parameter"),
            Self::InvalidRequestBody => (S::BAD_REQUEST, "C400-02", "Invalid request body"),
            Self::MissingRequiredField => (S::BAD_REQUEST, "C400-03", "A required field is missing"),
            Self::InvalidInputFormat => (S::BAD_REQUEST, "C400-04", "Input format is invalid"),
            Self::DataIntegrityViolation => (S::BAD_REQUEST, "C400-05", "Data integrity violation"),
            Self::RequestSizeExceeded => (S::BAD_REQUEST, "C400-06", "Request size exceeds the limit"),
            Self::UnsupportedMediaType => (S::BAD_REQUEST, "C400-07", "Unsupported media type"),

            Self::UnauthorizedResourceOwner => (
                S::UNAUTHORIZED,
                "A401-01",
                "No credentials were provided to access this resource",
            ),
            Self::InvalidToken => (S::UNAUTHORIZED, "A401-02", "Invalid authentication token"),
            Self::TokenExpired => (S::UNAUTHORIZED, "A401-03", "Authentication token has expired"),
            Self::InvalidCredentials => (S::UNAUTHORIZED, "A401-04", "Invalid login credentials"),
            Self::MissingToken => (S::UNAUTHORIZED, "A401-05", "Authentication token was not provided"),
            Self::TokenSignatureInvalid => (S::UNAUTHORIZED, "A401-06", "Token signature is invalid"),

            Self::InvalidResourceOwner => (
                S::FORBIDDEN,
                "A403-01",
                "You are not allowed to access this resource",
            ),
            Self::InsufficientPermissions => (
                S::FORBIDDEN,
                "A403-02",
                "Insufficient permissions for this operation",
            ),
            Self::AccessLimitExceeded => (S::FORBIDDEN, "A403-03", "Access attempt limit exceeded"),

            Self::NotFoundResource => (S::NOT_FOUND, "R404-01", "Resource not found"),
            Self::EndpointNotFound => (S::NOT_FOUND, "R404-02", "Requested endpoint was not found"),

            Self::InvalidRequestMethod => (S::METHOD_NOT_ALLOWED, "M405-01", "Invalid HTTP request method"),

            Self::ResourceConflict => (S::CONFLICT, "C409-01", "Resource conflict"),
            Self::ConcurrentModification => (
                S::CONFLICT,
                "C409-02",
                "Conflict caused by a concurrent modification",
            ),
            Self::VersionConflict => (S::CONFLICT, "C409-03", "Resource version conflict"),
            Self::DuplicateResource => (S::CONFLICT, "C409-04", "Resource already exists"),

            Self::UnprocessableRequest => (S::UNPROCESSABLE_ENTITY, "C422-01", "Request cannot be processed"),
            Self::ValidationFailed => (S::UNPROCESSABLE_ENTITY, "C422-02", "Data validation failed"),
            Self::BusinessRuleViolation => (S::UNPROCESSABLE_ENTITY, "C422-03", "Business rule violation"),

            Self::ServerError => (S::INTERNAL_SERVER_ERROR, "S500-01", "Internal Server Error"),
            Self::DatabaseError => (S::INTERNAL_SERVER_ERROR, "S500-02", "A database error occurred"),
            Self::ExternalApiError => (
                S::INTERNAL_SERVER_ERROR,
                "S500-03",
                "An error occurred while calling an external API",
            ),
            Self::UnexpectedError => (S::INTERNAL_SERVER_ERROR, "S500-04", "An unexpected error occurred"),
            Self::FileProcessingError => (
                S::INTERNAL_SERVER_ERROR,
                "S500-05",
                "An error occurred while processing a file",
            ),
            Self::IntegrationError => (
                S::INTERNAL_SERVER_ERROR,
                "S500-06",
                "An error occurred while integrating with an external system",
            ),

            Self::ServiceUnavailableNow => (
                S::SERVICE_UNAVAILABLE,
                "S503-01",
                "Service is temporarily unavailable",
            ),
            Self::MaintenanceMode => (S::SERVICE_UNAVAILABLE, "S503-02", "System is in maintenance mode"),
            Self::RateLimitExceeded => (S::SERVICE_UNAVAILABLE, "S503-03", "Request rate limit exceeded"),

            Self::Timeout => (S::GATEWAY_TIMEOUT, "G504-01", "Gateway timeout"),
        };

        CodeDefinition::new(status, code, message)
    }

    /// Look an entry up by its machine code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|entry| entry.definition().code == code)
    }
}

impl ExceptionCode for GlobalErrorCode {
    fn status(&self) -> StatusCode {
        self.definition().status
    }

    fn code(&self) -> &'static str {
        self.definition().code
    }

    fn message(&self) -> &'static str {
        self.definition().message
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn machine_codes_are_unique() -> bool {
    let all = GlobalErrorCode::ALL;
    let mut i = 0;
    while i < all.len() {
        let mut j = i + 1;
        while j < all.len() {
            if str_eq(all[i].definition().code, all[j].definition().code) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

// The catalog is rejected at compile time if two entries share a machine code.
const _: () = assert!(
    machine_codes_are_unique(),
    "GlobalErrorCode contains a duplicate machine code"
);
