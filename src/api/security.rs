//! Cross-origin and public-route policy.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method, header, request::Parts};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Methods browsers may use cross-origin.
pub const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Request headers browsers may send cross-origin.
pub const ALLOWED_HEADERS: [HeaderName; 4] = [
    header::AUTHORIZATION,
    header::CONTENT_TYPE,
    header::COOKIE,
    header::CACHE_CONTROL,
];

/// Static-resource locations served without authentication.
const STATIC_PREFIXES: [&str; 5] = ["/static/", "/css/", "/js/", "/images/", "/webjars/"];

/// Whether `path` can be reached without an authenticated principal.
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    STATIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        || path == "/favicon.ico"
        || path == "/metrics"
        || path == "/health"
        || path.starts_with("/health/")
}

/// An allowed origin, either exact or containing `*` wildcards.
///
/// `https://*.grit.im` admits `https://app.grit.im` but not `https://grit.im`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPattern {
    pattern: String,
}

impl OriginPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into().trim().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn matches(&self, origin: &str) -> bool {
        let mut parts = self.pattern.split('*');
        let Some(first) = parts.next() else {
            return false;
        };
        let Some(mut rest) = origin.strip_prefix(first) else {
            return false;
        };

        let tail: Vec<&str> = parts.collect();
        let Some((last, middle)) = tail.split_last() else {
            // No wildcard: the prefix must be the whole origin.
            return rest.is_empty();
        };

        for segment in middle {
            match rest.find(segment) {
                Some(index) => rest = &rest[index + segment.len()..],
                None => return false,
            }
        }
        rest.len() >= last.len() && rest.ends_with(last) && !rest[..rest.len() - last.len()].is_empty()
    }
}

/// CORS layer admitting `origins`, with credentials and the fixed method and
/// header sets. An empty origin list rejects every cross-origin request.
#[must_use]
pub fn cors_layer(origins: &[OriginPattern], max_age: Duration) -> CorsLayer {
    let origins: Arc<[OriginPattern]> = origins.into();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| origins.iter().any(|pattern| pattern.matches(origin)))
            },
        ))
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
        .allow_credentials(true)
        .max_age(max_age)
}
