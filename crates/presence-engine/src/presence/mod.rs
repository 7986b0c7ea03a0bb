//! Presence overrides -- operator-asserted status that outranks the calendar.
//!
//! A person has at most one presence record at a time (last write wins). A
//! record with an `expires_at` in the past is logically absent whether or not
//! the store has physically removed it yet; [`PresenceOverride::is_live`] is
//! the single place that rule lives.

pub mod memory;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::interval::PersonId;

/// The closed presence vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceStatus {
    Free,
    FreeNow,
    Busy,
    /// Carries no override: resolution falls through to the calendar.
    Away,
}

impl PresenceStatus {
    pub const ALL: [PresenceStatus; 4] = [
        PresenceStatus::Free,
        PresenceStatus::FreeNow,
        PresenceStatus::Busy,
        PresenceStatus::Away,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Free => "FREE",
            PresenceStatus::FreeNow => "FREE_NOW",
            PresenceStatus::Busy => "BUSY",
            PresenceStatus::Away => "AWAY",
        }
    }

    /// `FREE` and `FREE_NOW` force a free verdict.
    pub fn forces_free(&self) -> bool {
        matches!(self, PresenceStatus::Free | PresenceStatus::FreeNow)
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresenceStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        PresenceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                EngineError::InvalidStatus(format!(
                    "'{}' (expected one of FREE, FREE_NOW, BUSY, AWAY)",
                    s
                ))
            })
    }
}

/// The current presence record for one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceOverride {
    pub person_id: PersonId,
    pub status: PresenceStatus,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PresenceOverride {
    /// Live until the instant *after* `expires_at`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at >= now)
    }
}

/// Keyed presence storage with TTL semantics.
///
/// Implementations must hide expired records from every read. Each person's
/// record is independent; there is no cross-key locking and no
/// compare-and-set.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// The live record for `person_id`, if any.
    async fn get(&self, person_id: &PersonId) -> Result<Option<PresenceOverride>>;

    /// Live records for each of `person_ids`. Absent and expired entries are
    /// omitted from the map.
    async fn get_many(&self, person_ids: &[PersonId])
        -> Result<HashMap<PersonId, PresenceOverride>>;

    /// Overwrite the record for `person_id`. A past `expires_at` is accepted;
    /// the record is simply never observed as live.
    async fn set(
        &self,
        person_id: &PersonId,
        status: PresenceStatus,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PresenceOverride>;

    async fn clear(&self, person_id: &PersonId) -> Result<()>;
}
