//! Environment-driven configuration.
//!
//! Every setting is read through [`AppConfig::from_lookup`] so tests can
//! supply variables without touching the process environment.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::domain::ConfigError;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 3600;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 512;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Full service configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<SecretString>,
    pub security: SecurityConfig,
    pub policy: HttpPolicy,
    pub rate_limit: RateLimitConfig,
}

/// Secrets used by the security layer.
#[derive(Debug)]
pub struct SecurityConfig {
    pub password_pepper: SecretString,
    /// `(subject, key)` pairs accepted as bearer tokens.
    pub api_keys: Vec<(String, SecretString)>,
}

/// Request-pipeline behaviour shared by the router and its middleware.
#[derive(Debug, Clone)]
pub struct HttpPolicy {
    /// Origin patterns, exact or with `*` wildcards.
    pub allowed_origins: Vec<String>,
    pub cors_max_age: Duration,
    pub maintenance_mode: bool,
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub body_limit_bytes: usize,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            cors_max_age: Duration::from_secs(DEFAULT_CORS_MAX_AGE_SECS),
            maintenance_mode: false,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl HttpPolicy {
    pub fn with_allowed_origins(mut self, origins: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_maintenance_mode(mut self, enabled: bool) -> Self {
        self.maintenance_mode = enabled;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit_bytes = bytes;
        self
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per second per client IP
    pub requests_per_second: u32,
    /// Burst size per client IP
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst: 20,
        }
    }
}

impl RateLimitConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            requests_per_second: parse_positive(&lookup, "RATE_LIMIT_RPS", defaults.requests_per_second)?,
            burst: parse_positive(&lookup, "RATE_LIMIT_BURST", defaults.burst)?,
        })
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr: SocketAddr =
            parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let database_url = non_empty(&lookup, "DATABASE_URL").map(SecretString::from);

        let password_pepper = non_empty(&lookup, "APP_SECURITY_PASSWORD_PEPPER")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("APP_SECURITY_PASSWORD_PEPPER".to_string()))?;

        let api_keys = match non_empty(&lookup, "APP_SECURITY_API_KEYS") {
            Some(raw) => parse_api_keys(&raw)?,
            None => Vec::new(),
        };

        let allowed_origins: Vec<String> = non_empty(&lookup, "APP_SECURITY_ALLOWED_ORIGINS")
            .map(|raw| comma_list(&raw).map(ToString::to_string).collect())
            .unwrap_or_default();

        let policy = HttpPolicy {
            allowed_origins,
            cors_max_age: Duration::from_secs(parse_or(
                &lookup,
                "APP_SECURITY_CORS_MAX_AGE",
                DEFAULT_CORS_MAX_AGE_SECS,
            )?),
            maintenance_mode: parse_bool(&lookup, "APP_MAINTENANCE_MODE", false)?,
            request_timeout: Duration::from_secs(parse_positive(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            max_concurrent_requests: parse_positive(
                &lookup,
                "MAX_CONCURRENT_REQUESTS",
                DEFAULT_MAX_CONCURRENT_REQUESTS,
            )?,
            body_limit_bytes: parse_positive(&lookup, "MAX_BODY_BYTES", DEFAULT_BODY_LIMIT_BYTES)?,
        };

        Ok(Self {
            bind_addr,
            database_url,
            security: SecurityConfig {
                password_pepper,
                api_keys,
            },
            policy,
            rate_limit: RateLimitConfig::from_lookup(&lookup)?,
        })
    }
}

/// Trimmed, non-blank entries of a comma-separated list.
fn comma_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|entry| !entry.is_empty())
}

/// Parse `subject=key` pairs separated by commas.
fn parse_api_keys(raw: &str) -> Result<Vec<(String, SecretString)>, ConfigError> {
    comma_list(raw)
        .map(|entry| {
            let (subject, key) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                key: "APP_SECURITY_API_KEYS".to_string(),
                message: "entries must look like subject=key".to_string(),
            })?;
            let (subject, key) = (subject.trim(), key.trim());
            if subject.is_empty() || key.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "APP_SECURITY_API_KEYS".to_string(),
                    message: "subject and key must not be empty".to_string(),
                });
            }
            Ok((subject.to_string(), SecretString::from(key.to_string())))
        })
        .collect()
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw.parse().map_err(|err: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: err.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: Display,
{
    let value = parse_or(lookup, key, default)?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool, ConfigError> {
    match non_empty(lookup, key).map(|raw| raw.to_ascii_lowercase()) {
        Some(raw) => match raw.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got '{raw}'"),
            }),
        },
        None => Ok(default),
    }
}
