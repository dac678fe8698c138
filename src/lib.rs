//! Grit platform server skeleton
//!
//! The cross-cutting pieces every endpoint shares: a uniform JSON error
//! envelope, audited entities, the CORS and authentication policy, and a
//! peppered password encoder.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   API Layer                  │
//! │ routing, middleware, extractors, error table │
//! ├─────────────────────────────────────────────┤
//! │               Application Layer              │
//! │      configuration, shared state, service    │
//! ├─────────────────────────────────────────────┤
//! │                 Domain Layer                 │
//! │ error catalog, failures, envelopes, auditing │
//! ├─────────────────────────────────────────────┤
//! │             Infrastructure Layer             │
//! │  Postgres, BCrypt, API keys, observability   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use grit_platform_server::api::create_router;
//! use grit_platform_server::app::{AppConfig, AppState};
//! use grit_platform_server::infra::{ApiKeyVerifier, PepperedPasswordEncoder};
//!
//! let config = AppConfig::from_env()?;
//! let state = AppState::new(
//!     Arc::new(ApiKeyVerifier::new(&config.security.api_keys)),
//!     Arc::new(PepperedPasswordEncoder::new(config.security.password_pepper)),
//! )
//! .with_policy(config.policy);
//! let router = create_router(Arc::new(state));
//! ```

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;

// Test utilities are available in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
