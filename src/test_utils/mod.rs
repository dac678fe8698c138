//! Test utilities and mock implementations.
//!
//! This module provides reusable mock implementations of domain traits
//! for use in unit and integration tests.

pub mod mocks;

use std::sync::Arc;

pub use mocks::{FixedClock, MockDatabaseClient, MockPasswordEncoder, MockTokenVerifier};

use crate::app::{AppState, HttpPolicy};

/// Bearer token the default test verifier accepts.
pub const TEST_TOKEN: &str = "test-token";
/// Subject [`TEST_TOKEN`] resolves to.
pub const TEST_SUBJECT: &str = "tester";

/// State wired with mocks: [`TEST_TOKEN`] authenticates, nothing else does.
#[must_use]
pub fn test_state(policy: HttpPolicy) -> Arc<AppState> {
    let verifier = MockTokenVerifier::new().with_principal(TEST_TOKEN, TEST_SUBJECT);
    Arc::new(
        AppState::new(Arc::new(verifier), Arc::new(MockPasswordEncoder::new())).with_policy(policy),
    )
}
