//! Translation of [`AppError`] into the JSON error envelope.
//!
//! Every failure passes through one ordered rule table. Rules are evaluated
//! top to bottom and the first one that matches produces the response, so
//! more specific rules must precede the general ones they overlap with. The
//! table ends with a catch-all; no failure leaves the service untranslated.

use std::io::ErrorKind;

use axum::{
    Json,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::domain::{
    AppError, AuthError, CodeDefinition, ErrorResponse, ExternalError, GlobalErrorCode,
    RequestError, StorageError,
};

/// Log level used when a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warn,
    Error,
}

/// Where a rule takes its catalog entry from.
#[derive(Debug, Clone, Copy)]
pub enum CodeSource {
    Catalog(GlobalErrorCode),
    /// The entry the raising code attached to the failure.
    Carried,
}

/// How a rule builds the response message.
#[derive(Debug, Clone, Copy)]
pub enum MessagePolicy {
    /// The entry's default message.
    Default,
    Fixed(&'static str),
    /// The message the raising code attached to the failure.
    Carried,
    /// The entry's default message plus the failure's field errors.
    FieldErrors,
}

/// One row of the dispatch table.
pub struct Rule {
    pub name: &'static str,
    matches: fn(&AppError) -> bool,
    code: CodeSource,
    message: MessagePolicy,
    severity: Severity,
}

impl Rule {
    const fn new(
        name: &'static str,
        matches: fn(&AppError) -> bool,
        code: CodeSource,
        message: MessagePolicy,
    ) -> Self {
        Self {
            name,
            matches,
            code,
            message,
            severity: Severity::Error,
        }
    }

    const fn fixed(
        name: &'static str,
        matches: fn(&AppError) -> bool,
        code: GlobalErrorCode,
        message: &'static str,
    ) -> Self {
        Self::new(name, matches, CodeSource::Catalog(code), MessagePolicy::Fixed(message))
    }

    const fn warn(mut self) -> Self {
        self.severity = Severity::Warn;
        self
    }

    /// Builds the response if this rule matches and everything it needs is
    /// present on the failure.
    fn apply(&self, err: &AppError) -> Option<Dispatch> {
        if !(self.matches)(err) {
            return None;
        }

        let definition = match self.code {
            CodeSource::Catalog(code) => code.definition(),
            CodeSource::Carried => err.carried_code()?,
        };

        let response = match self.message {
            MessagePolicy::Default => ErrorResponse::of(&definition),
            MessagePolicy::Fixed(message) => ErrorResponse::with_message(&definition, message),
            MessagePolicy::Carried => {
                ErrorResponse::with_message(&definition, err.carried_message()?)
            }
            MessagePolicy::FieldErrors => {
                ErrorResponse::with_field_errors(&definition, err.field_errors()?.to_vec())
            }
        };

        Some(Dispatch {
            rule: self.name,
            severity: self.severity,
            definition,
            response,
        })
    }
}

/// Outcome of running a failure through the table.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub rule: &'static str,
    pub severity: Severity,
    pub definition: CodeDefinition,
    pub response: ErrorResponse,
}

fn io_kind(err: &AppError, kind: ErrorKind) -> bool {
    matches!(err, AppError::Io(io) if io.kind() == kind)
}

use GlobalErrorCode as G;

/// The dispatch table, most specific rule first.
pub static RULES: &[Rule] = &[
    Rule::new(
        "business",
        |e: &AppError| matches!(e, AppError::Business(_)),
        CodeSource::Carried,
        MessagePolicy::Carried,
    ),
    Rule::new(
        "business_rule_violation",
        |e: &AppError| matches!(e, AppError::BusinessRuleViolation(_)),
        CodeSource::Catalog(G::BusinessRuleViolation),
        MessagePolicy::Carried,
    ),
    Rule::new(
        "maintenance_mode",
        |e: &AppError| matches!(e, AppError::MaintenanceMode(_)),
        CodeSource::Catalog(G::MaintenanceMode),
        MessagePolicy::Carried,
    )
    .warn(),
    Rule::fixed(
        "rate_limit_exceeded",
        |e: &AppError| matches!(e, AppError::RateLimitExceeded { .. }),
        G::RateLimitExceeded,
        "Request rate limit exceeded. Please slow down.",
    ),
    Rule::new(
        "binding",
        |e: &AppError| matches!(e, AppError::Validation(_)),
        CodeSource::Catalog(G::InvalidRequestParameter),
        MessagePolicy::FieldErrors,
    ),
    Rule::fixed(
        "unreadable_body",
        |e: &AppError| matches!(e, AppError::Request(RequestError::InvalidBody(_))),
        G::InvalidRequestBody,
        "The request body could not be read. Check that it is valid JSON.",
    ),
    Rule::fixed(
        "missing_parameter",
        |e: &AppError| matches!(e, AppError::Request(RequestError::MissingParameter(_))),
        G::MissingRequiredField,
        "A required parameter is missing.",
    ),
    Rule::fixed(
        "type_mismatch",
        |e: &AppError| matches!(e, AppError::Request(RequestError::TypeMismatch(_))),
        G::InvalidInputFormat,
        "A request parameter has an invalid format.",
    ),
    Rule::fixed(
        "payload_too_large",
        |e: &AppError| matches!(e, AppError::Request(RequestError::PayloadTooLarge)),
        G::RequestSizeExceeded,
        "The request payload exceeds the size limit.",
    ),
    Rule::fixed(
        "unsupported_media_type",
        |e: &AppError| matches!(e, AppError::Request(RequestError::UnsupportedMediaType(_))),
        G::UnsupportedMediaType,
        "The media type is not supported.",
    ),
    Rule::fixed(
        "endpoint_not_found",
        |e: &AppError| matches!(e, AppError::Request(RequestError::EndpointNotFound(_))),
        G::EndpointNotFound,
        "The requested endpoint does not exist.",
    ),
    Rule::fixed(
        "method_not_allowed",
        |e: &AppError| matches!(e, AppError::Request(RequestError::MethodNotAllowed { .. })),
        G::InvalidRequestMethod,
        "The HTTP method is not supported for this endpoint.",
    ),
    Rule::new(
        "constraint_violation",
        |e: &AppError| matches!(e, AppError::ConstraintViolation(_)),
        CodeSource::Catalog(G::ValidationFailed),
        MessagePolicy::FieldErrors,
    ),
    Rule::fixed(
        "unauthenticated",
        |e: &AppError| matches!(e, AppError::Auth(AuthError::Unauthenticated)),
        G::UnauthorizedResourceOwner,
        "Authentication is required.",
    ),
    Rule::fixed(
        "invalid_token",
        |e: &AppError| matches!(e, AppError::Auth(AuthError::InvalidToken(_))),
        G::InvalidToken,
        "The authentication token is invalid.",
    ),
    Rule::fixed(
        "token_expired",
        |e: &AppError| matches!(e, AppError::Auth(AuthError::TokenExpired)),
        G::TokenExpired,
        "The authentication token has expired.",
    ),
    Rule::fixed(
        "bad_credentials",
        |e: &AppError| matches!(e, AppError::Auth(AuthError::BadCredentials)),
        G::InvalidCredentials,
        "Invalid login credentials.",
    ),
    Rule::fixed(
        "missing_token",
        |e: &AppError| matches!(e, AppError::Auth(AuthError::MissingToken)),
        G::MissingToken,
        "An authentication token is required.",
    ),
    Rule::fixed(
        "invalid_signature",
        |e: &AppError| matches!(e, AppError::Auth(AuthError::InvalidSignature)),
        G::TokenSignatureInvalid,
        "The token signature is invalid.",
    ),
    Rule::fixed(
        "access_denied",
        |e: &AppError| matches!(e, AppError::Auth(AuthError::AccessDenied(_))),
        G::InvalidResourceOwner,
        "You do not have access to this resource.",
    ),
    Rule::fixed(
        "insufficient_authentication",
        |e: &AppError| matches!(e, AppError::Auth(AuthError::InsufficientAuthentication)),
        G::InsufficientPermissions,
        "Additional authentication is required.",
    ),
    Rule::fixed(
        "account_disabled",
        |e: &AppError| matches!(e, AppError::Auth(AuthError::Disabled)),
        G::InsufficientPermissions,
        "The account is disabled.",
    ),
    Rule::fixed(
        "account_locked",
        |e: &AppError| matches!(e, AppError::Auth(AuthError::Locked)),
        G::AccessLimitExceeded,
        "The account is locked.",
    ),
    Rule::fixed(
        "not_found",
        |e: &AppError| matches!(e, AppError::NotFound(_)),
        G::NotFoundResource,
        "The requested resource was not found.",
    ),
    Rule::fixed(
        "illegal_argument",
        |e: &AppError| matches!(e, AppError::IllegalArgument(_)),
        G::ResourceConflict,
        "A resource conflict occurred.",
    ),
    Rule::fixed(
        "optimistic_lock",
        |e: &AppError| matches!(e, AppError::Storage(StorageError::OptimisticLock(_))),
        G::ConcurrentModification,
        "Another user modified this resource. Please try again.",
    ),
    Rule::fixed(
        "sql_conflict",
        |e: &AppError| matches!(e, AppError::Storage(s) if s.is_serialization_conflict()),
        G::VersionConflict,
        "A resource version conflict occurred.",
    ),
    Rule::fixed(
        "duplicate_key",
        |e: &AppError| matches!(e, AppError::Storage(StorageError::DuplicateKey(_))),
        G::DuplicateResource,
        "The resource already exists.",
    ),
    Rule::fixed(
        "integrity_violation",
        |e: &AppError| matches!(e, AppError::Storage(StorageError::IntegrityViolation(_))),
        G::DataIntegrityViolation,
        "A data integrity violation occurred.",
    ),
    Rule::fixed(
        "entity_not_found",
        |e: &AppError| {
            matches!(
                e,
                AppError::Storage(StorageError::EntityNotFound(_) | StorageError::PropertyReference(_))
            )
        },
        G::NotFoundResource,
        "The requested resource was not found.",
    ),
    Rule::fixed(
        "timeout",
        |e: &AppError| {
            matches!(
                e,
                AppError::Timeout(_)
                    | AppError::External(ExternalError::Timeout(_))
                    | AppError::Storage(StorageError::PoolTimedOut)
            ) || io_kind(e, ErrorKind::TimedOut)
        },
        G::Timeout,
        "The upstream service did not respond in time.",
    ),
    Rule::fixed(
        "data_access",
        |e: &AppError| matches!(e, AppError::Storage(_)),
        G::DatabaseError,
        "A database error occurred.",
    ),
    Rule::fixed(
        "unsupported_operation",
        |e: &AppError| matches!(e, AppError::UnsupportedOperation(_)),
        G::UnprocessableRequest,
        "The request cannot be processed.",
    ),
    Rule::fixed(
        "connect",
        |e: &AppError| {
            matches!(e, AppError::External(ExternalError::Connect(_)))
                || io_kind(e, ErrorKind::ConnectionRefused)
        },
        G::IntegrationError,
        "An error occurred while integrating with an external system.",
    ),
    Rule::fixed(
        "external_api",
        |e: &AppError| matches!(e, AppError::External(_)),
        G::ExternalApiError,
        "An error occurred while calling an external API.",
    ),
    Rule::fixed(
        "io",
        |e: &AppError| matches!(e, AppError::Io(_)),
        G::FileProcessingError,
        "An error occurred while processing a file.",
    ),
    Rule::fixed(
        "overloaded",
        |e: &AppError| matches!(e, AppError::Overloaded),
        G::ServiceUnavailableNow,
        "The service is temporarily unavailable.",
    ),
    Rule::fixed(
        "unexpected",
        |e: &AppError| matches!(e, AppError::IllegalState(_) | AppError::Unexpected(_)),
        G::UnexpectedError,
        "An unexpected error occurred.",
    ),
    CATCH_ALL,
];

const CATCH_ALL_MESSAGE: &str = "An internal server error occurred.";

const CATCH_ALL: Rule = Rule::fixed(
    "server_error",
    |_: &AppError| true,
    G::ServerError,
    CATCH_ALL_MESSAGE,
);

/// Runs `err` through [`RULES`] and returns the first match.
///
/// [`RULES`] ends with a rule that matches everything and needs nothing from
/// the failure, so the search always succeeds. The fallback below builds the
/// same response without going through the table.
#[must_use]
pub fn dispatch(err: &AppError) -> Dispatch {
    RULES
        .iter()
        .find_map(|rule| rule.apply(err))
        .unwrap_or_else(|| {
            let definition = G::ServerError.definition();
            Dispatch {
                rule: CATCH_ALL.name,
                severity: CATCH_ALL.severity,
                definition,
                response: ErrorResponse::with_message(&definition, CATCH_ALL_MESSAGE),
            }
        })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Dispatch {
            rule,
            severity,
            definition,
            response,
        } = dispatch(&self);

        match severity {
            Severity::Warn => warn!(rule, code = definition.code, error = %self, "Request failed"),
            Severity::Error => error!(rule, code = definition.code, error = ?self, "Request failed"),
        }
        metrics::counter!("http_errors_total", "code" => definition.code).increment(1);

        let mut http = (definition.status, Json(response)).into_response();
        if let AppError::RateLimitExceeded { retry_after_secs } = self {
            http.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        http
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BusinessError, ExceptionCode, FieldError};
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    fn code_of(err: AppError) -> &'static str {
        dispatch(&err).definition.code
    }

    #[test]
    fn test_table_ends_with_catch_all() {
        let last = RULES.last().unwrap();
        assert_eq!(last.name, "server_error");
        assert!((last.matches)(&AppError::Overloaded));
    }

    #[test]
    fn test_table_resolves_every_failure_kind() {
        let samples = [
            AppError::business(&G::DuplicateResource),
            AppError::BusinessRuleViolation("x".into()),
            AppError::MaintenanceMode("x".into()),
            AppError::RateLimitExceeded { retry_after_secs: 1 },
            AppError::Validation(Vec::new()),
            AppError::ConstraintViolation(Vec::new()),
            AppError::Request(RequestError::PayloadTooLarge),
            AppError::Auth(AuthError::Disabled),
            AppError::Storage(StorageError::Sql {
                state: None,
                message: "x".into(),
            }),
            AppError::External(ExternalError::Http("x".into())),
            AppError::Io(std::io::Error::other("x")),
            AppError::NotFound("x".into()),
            AppError::IllegalArgument("x".into()),
            AppError::UnsupportedOperation("x".into()),
            AppError::IllegalState("x".into()),
            AppError::Timeout("x".into()),
            AppError::Overloaded,
            AppError::Unexpected("x".into()),
            AppError::Other(anyhow::anyhow!("x")),
        ];

        for err in &samples {
            assert!(
                RULES.iter().find_map(|rule| rule.apply(err)).is_some(),
                "{err:?}"
            );
        }
    }

    #[test]
    fn test_catch_all_rule_matches_fallback_response() {
        let err = AppError::Other(anyhow::anyhow!("x"));
        let from_table = CATCH_ALL.apply(&err).unwrap();

        assert_eq!(from_table.response.code, "S500-01");
        assert_eq!(from_table.response.message, CATCH_ALL_MESSAGE);
        assert_eq!(dispatch(&err).response.message, CATCH_ALL_MESSAGE);
    }

    #[test]
    fn test_rule_names_are_unique() {
        let mut names: Vec<_> = RULES.iter().map(|rule| rule.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RULES.len());
    }

    #[test]
    fn test_business_error_uses_carried_code_and_message() {
        let err = AppError::Business(BusinessError::with_message(
            &G::DuplicateResource,
            "nickname taken",
        ));
        let outcome = dispatch(&err);

        assert_eq!(outcome.rule, "business");
        assert_eq!(outcome.response.code, "C409-04");
        assert_eq!(outcome.response.status, 409);
        assert_eq!(outcome.response.message, "nickname taken");
    }

    #[test]
    fn test_business_error_without_override_uses_default_message() {
        let outcome = dispatch(&AppError::business(&G::BusinessRuleViolation));

        assert_eq!(outcome.response.code, "C422-03");
        assert_eq!(outcome.response.message, G::BusinessRuleViolation.definition().message);
        assert!(outcome.response.errors.is_empty());
    }

    #[test]
    fn test_business_rule_violation_keeps_message() {
        let outcome = dispatch(&AppError::BusinessRuleViolation(
            "cannot follow yourself".to_string(),
        ));
        assert_eq!(outcome.response.code, "C422-03");
        assert_eq!(outcome.response.status, 422);
        assert_eq!(outcome.response.message, "cannot follow yourself");
    }

    #[test]
    fn test_maintenance_is_logged_at_warn() {
        let outcome = dispatch(&AppError::MaintenanceMode("back at 10:00".to_string()));
        assert_eq!(outcome.response.code, "S503-02");
        assert_eq!(outcome.response.message, "back at 10:00");
        assert_eq!(outcome.severity, Severity::Warn);
    }

    #[test]
    fn test_other_rules_log_at_error() {
        for rule in RULES.iter().filter(|rule| rule.name != "maintenance_mode") {
            assert_eq!(rule.severity, Severity::Error, "{}", rule.name);
        }
    }

    #[test]
    fn test_validation_carries_field_errors() {
        let fields = vec![
            FieldError::new("email", Some("x"), Some("must be a valid email")),
            FieldError::new("nickname", Some(""), Some("must not be blank")),
        ];
        let outcome = dispatch(&AppError::Validation(fields.clone()));

        assert_eq!(outcome.response.code, "C400-01");
        assert_eq!(outcome.response.errors, fields);
        assert_eq!(
            outcome.response.message,
            G::InvalidRequestParameter.message()
        );

        let outcome = dispatch(&AppError::ConstraintViolation(fields.clone()));
        assert_eq!(outcome.response.code, "C422-02");
        assert_eq!(outcome.response.errors, fields);
    }

    #[test]
    fn test_request_failures() {
        let cases = [
            (RequestError::InvalidBody("eof".into()), "C400-02"),
            (RequestError::MissingParameter("page".into()), "C400-03"),
            (RequestError::TypeMismatch("page".into()), "C400-04"),
            (RequestError::PayloadTooLarge, "C400-06"),
            (RequestError::UnsupportedMediaType("text/plain".into()), "C400-07"),
            (RequestError::EndpointNotFound("/nope".into()), "R404-02"),
            (
                RequestError::MethodNotAllowed {
                    method: "DELETE".into(),
                    path: "/health".into(),
                },
                "M405-01",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(code_of(AppError::Request(err)), expected);
        }
    }

    #[test]
    fn test_auth_sub_taxonomy() {
        let cases = [
            (AuthError::Unauthenticated, "A401-01"),
            (AuthError::InvalidToken("bad".into()), "A401-02"),
            (AuthError::TokenExpired, "A401-03"),
            (AuthError::BadCredentials, "A401-04"),
            (AuthError::MissingToken, "A401-05"),
            (AuthError::InvalidSignature, "A401-06"),
            (AuthError::AccessDenied("admin only".into()), "A403-01"),
            (AuthError::InsufficientAuthentication, "A403-02"),
            (AuthError::Disabled, "A403-02"),
            (AuthError::Locked, "A403-03"),
        ];
        for (err, expected) in cases {
            assert_eq!(code_of(AppError::Auth(err)), expected);
        }
    }

    #[test]
    fn test_storage_failures() {
        let sql = |state: &str| {
            AppError::Storage(StorageError::Sql {
                state: Some(state.to_string()),
                message: "boom".to_string(),
            })
        };

        assert_eq!(code_of(sql("23000")), "C409-03");
        assert_eq!(code_of(sql("40001")), "C409-03");
        assert_eq!(code_of(sql("42S00")), "S500-02");
        assert_eq!(
            code_of(AppError::Storage(StorageError::Sql {
                state: None,
                message: "boom".to_string(),
            })),
            "S500-02"
        );
        assert_eq!(
            code_of(AppError::Storage(StorageError::OptimisticLock("v1".into()))),
            "C409-02"
        );
        assert_eq!(
            code_of(AppError::Storage(StorageError::DuplicateKey("email".into()))),
            "C409-04"
        );
        assert_eq!(
            code_of(AppError::Storage(StorageError::IntegrityViolation("fk".into()))),
            "C400-05"
        );
        assert_eq!(
            code_of(AppError::Storage(StorageError::EntityNotFound("7".into()))),
            "R404-01"
        );
        assert_eq!(
            code_of(AppError::Storage(StorageError::PropertyReference("nick".into()))),
            "R404-01"
        );
        assert_eq!(
            code_of(AppError::Storage(StorageError::Connection("refused".into()))),
            "S500-02"
        );
        assert_eq!(code_of(AppError::Storage(StorageError::PoolTimedOut)), "G504-01");
    }

    #[test]
    fn test_unique_violation_is_duplicate_resource() {
        use sqlx::error::ErrorKind;

        let unique = StorageError::from_database(ErrorKind::UniqueViolation, Some("23505"), "dup");
        assert_eq!(code_of(AppError::Storage(unique)), "C409-04");

        let not_null = StorageError::from_database(ErrorKind::NotNullViolation, Some("23502"), "null");
        assert_eq!(code_of(AppError::Storage(not_null)), "C400-05");
    }

    #[test]
    fn test_integrity_violation_hides_detail() {
        let outcome = dispatch(&AppError::Storage(StorageError::IntegrityViolation(
            "members_email_key on secret_table".into(),
        )));
        assert!(!outcome.response.message.contains("secret_table"));
    }

    #[test]
    fn test_io_specific_kinds_precede_generic_io() {
        let io = |kind| AppError::Io(std::io::Error::new(kind, "io"));

        assert_eq!(code_of(io(ErrorKind::TimedOut)), "G504-01");
        assert_eq!(code_of(io(ErrorKind::ConnectionRefused)), "S500-06");
        assert_eq!(code_of(io(ErrorKind::NotFound)), "S500-05");
    }

    #[test]
    fn test_external_failures() {
        assert_eq!(
            code_of(AppError::External(ExternalError::Timeout("slow".into()))),
            "G504-01"
        );
        assert_eq!(
            code_of(AppError::External(ExternalError::Connect("refused".into()))),
            "S500-06"
        );
        assert_eq!(
            code_of(AppError::External(ExternalError::Http("502".into()))),
            "S500-03"
        );
    }

    #[test]
    fn test_generic_failures() {
        assert_eq!(code_of(AppError::NotFound("member 1".into())), "R404-01");
        assert_eq!(code_of(AppError::IllegalArgument("x".into())), "C409-01");
        assert_eq!(code_of(AppError::UnsupportedOperation("x".into())), "C422-01");
        assert_eq!(code_of(AppError::Timeout("30s".into())), "G504-01");
        assert_eq!(code_of(AppError::Overloaded), "S503-01");
        assert_eq!(code_of(AppError::IllegalState("x".into())), "S500-04");
        assert_eq!(code_of(AppError::Unexpected("panic".into())), "S500-04");
    }

    #[test]
    fn test_unknown_failures_fall_through_to_catch_all() {
        let outcome = dispatch(&AppError::Other(anyhow::anyhow!("something odd")));
        assert_eq!(outcome.rule, "server_error");
        assert_eq!(outcome.response.code, "S500-01");
        assert_eq!(outcome.response.status, 500);
        assert!(!outcome.response.message.contains("something odd"));
    }

    #[test]
    fn test_rate_limit_rule() {
        let outcome = dispatch(&AppError::RateLimitExceeded { retry_after_secs: 3 });
        assert_eq!(outcome.response.code, "S503-03");
        assert_eq!(outcome.response.status, 503);
    }

    #[test]
    fn test_dispatch_status_matches_entry() {
        let samples = [
            AppError::Overloaded,
            AppError::NotFound("x".into()),
            AppError::Auth(AuthError::Locked),
            AppError::Storage(StorageError::DuplicateKey("k".into())),
            AppError::Timeout("t".into()),
        ];
        for err in samples {
            let outcome = dispatch(&err);
            assert_eq!(outcome.response.status, outcome.definition.status.as_u16());
            assert!(GlobalErrorCode::from_code(&outcome.response.code).is_some());
        }
    }

    #[tokio::test]
    async fn test_into_response_writes_envelope() {
        let response = AppError::Auth(AuthError::TokenExpired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let envelope: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope.code, "A401-03");
        assert_eq!(envelope.status, 401);
        assert!(envelope.errors.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited_response_has_retry_after() {
        let response = AppError::RateLimitExceeded { retry_after_secs: 4 }.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "4");
    }
}
