//! Peppered BCrypt password encoder.
//!
//! The pepper is an application-wide secret appended to every raw password
//! before hashing, so a leaked hash table alone cannot be brute-forced.

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::domain::{PasswordEncoder, PasswordError};

/// BCrypt cost factor.
pub const PASSWORD_STRENGTH: u32 = 12;

#[derive(Debug)]
pub struct PepperedPasswordEncoder {
    pepper: SecretString,
    cost: u32,
}

impl PepperedPasswordEncoder {
    #[must_use]
    pub fn new(pepper: SecretString) -> Self {
        Self {
            pepper,
            cost: PASSWORD_STRENGTH,
        }
    }

    /// Override the cost factor. Only tests should go below the default.
    #[must_use]
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    fn peppered(&self, raw: &str) -> String {
        format!("{raw}{}", self.pepper.expose_secret())
    }
}

impl PasswordEncoder for PepperedPasswordEncoder {
    fn encode(&self, raw: Option<&str>) -> Result<String, PasswordError> {
        let raw = raw.ok_or(PasswordError::MissingPassword)?;
        bcrypt::hash(self.peppered(raw), self.cost).map_err(|e| PasswordError::Hash(e.to_string()))
    }

    fn matches(&self, raw: Option<&str>, encoded: Option<&str>) -> bool {
        let (Some(raw), Some(encoded)) = (raw, encoded) else {
            return false;
        };
        bcrypt::verify(self.peppered(raw), encoded).unwrap_or_else(|e| {
            warn!(error = %e, "Stored password hash is malformed");
            false
        })
    }
}
