//! Audit metadata for persisted entities.
//!
//! Entities wrapped in [`Audited`] carry a surrogate id plus creation and
//! modification stamps. The stamps are written by an [`AuditingListener`]
//! on the persistence path; the acting user is always passed in explicitly.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::traits::Clock;
use super::types::{EntityId, Principal};

/// Name recorded when no authenticated principal is present.
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Who performed a write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Actor {
    Anonymous,
    User(String),
}

impl Actor {
    /// The principal's name, or [`Actor::Anonymous`] without one.
    #[must_use]
    pub fn from_principal(principal: Option<&Principal>) -> Self {
        match principal {
            Some(principal) if !principal.subject.is_empty() => {
                Self::User(principal.subject.clone())
            }
            _ => Self::Anonymous,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Anonymous => ANONYMOUS_ACTOR,
            Self::User(name) => name,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> Self {
        actor.as_str().to_string()
    }
}

impl From<String> for Actor {
    fn from(name: String) -> Self {
        if name == ANONYMOUS_ACTOR || name.is_empty() {
            Self::Anonymous
        } else {
            Self::User(name)
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("Entity id is already assigned ({0})")]
    IdAlreadyAssigned(EntityId),
    #[error("Entity creation was already recorded")]
    AlreadyCreated,
    #[error("Entity has not been persisted yet")]
    NotYetCreated,
}

impl From<AuditError> for super::AppError {
    fn from(err: AuditError) -> Self {
        super::AppError::IllegalState(err.to_string())
    }
}

/// Creation and last-modification times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Timestamps {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild from stored columns.
    #[must_use]
    pub fn restore(created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Timestamps plus the actors that created and last modified the entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    #[serde(flatten)]
    timestamps: Timestamps,
    created_by: String,
    updated_by: String,
}

impl AuditTrail {
    #[must_use]
    pub fn created(actor: &Actor, now: DateTime<Utc>) -> Self {
        Self {
            timestamps: Timestamps::new(now),
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
        }
    }

    /// Rebuild from stored columns.
    #[must_use]
    pub fn restore(timestamps: Timestamps, created_by: String, updated_by: String) -> Self {
        Self {
            timestamps,
            created_by,
            updated_by,
        }
    }

    #[must_use]
    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.timestamps.created_at()
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.timestamps.updated_at()
    }

    #[must_use]
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    #[must_use]
    pub fn updated_by(&self) -> &str {
        &self.updated_by
    }

    fn touch(&mut self, actor: &Actor, now: DateTime<Utc>) {
        self.timestamps.touch(now);
        self.updated_by = actor.to_string();
    }
}

/// An entity value together with its identity and audit trail.
///
/// A fresh `Audited` has neither id nor trail. The id can be assigned once;
/// the trail is only ever written through an [`AuditingListener`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audited<T> {
    id: Option<EntityId>,
    audit: Option<AuditTrail>,
    #[serde(flatten)]
    value: T,
}

impl<T> Audited<T> {
    pub fn new(value: T) -> Self {
        Self {
            id: None,
            audit: None,
            value,
        }
    }

    /// Rebuild an entity loaded from storage.
    pub fn restore(id: EntityId, audit: AuditTrail, value: T) -> Self {
        Self {
            id: Some(id),
            audit: Some(audit),
            value,
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Store the generated key; a second assignment is rejected.
    pub fn assign_id(&mut self, id: EntityId) -> Result<(), AuditError> {
        match self.id {
            Some(existing) => Err(AuditError::IdAlreadyAssigned(existing)),
            None => {
                self.id = Some(id);
                Ok(())
            }
        }
    }

    pub fn audit(&self) -> Option<&AuditTrail> {
        self.audit.as_ref()
    }

    /// True until the first persistence has been recorded.
    pub fn is_new(&self) -> bool {
        self.audit.is_none()
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Writes audit stamps at persistence time.
#[derive(Debug, Clone, Default)]
pub struct AuditingListener<C> {
    clock: C,
}

impl<C: Clock> AuditingListener<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Record the first persistence of `entity`.
    pub fn touch_for_create<T>(&self, entity: &mut Audited<T>, actor: &Actor) -> Result<(), AuditError> {
        if entity.audit.is_some() {
            return Err(AuditError::AlreadyCreated);
        }
        entity.audit = Some(AuditTrail::created(actor, self.clock.now()));
        Ok(())
    }

    /// Record a modification of an already persisted `entity`.
    pub fn touch_for_update<T>(&self, entity: &mut Audited<T>, actor: &Actor) -> Result<(), AuditError> {
        let audit = entity.audit.as_mut().ok_or(AuditError::NotYetCreated)?;
        audit.touch(actor, self.clock.now());
        Ok(())
    }

    /// Create on first persistence, update afterwards.
    pub fn on_persist<T>(&self, entity: &mut Audited<T>, actor: &Actor) {
        let now = self.clock.now();
        match entity.audit.as_mut() {
            Some(audit) => audit.touch(actor, now),
            None => entity.audit = Some(AuditTrail::created(actor, now)),
        }
    }
}
