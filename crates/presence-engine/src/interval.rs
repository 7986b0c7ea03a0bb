//! Calendar-derived busy intervals and the source that supplies them.
//!
//! The engine never normalizes calendar data itself. An [`IntervalSource`]
//! hands back, per person, the busy intervals that overlap the query window,
//! ordered by start time.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{EngineError, Result};
use crate::grid::TimeWindow;

/// Opaque person identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PersonId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// How strongly a calendar entry blocks time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BusyKind {
    /// An opaque calendar entry.
    #[default]
    Hard,
    /// A transparent calendar entry. Blocks exactly like `Hard` for now.
    Soft,
}

/// A half-open busy period `[start_utc, end_utc)` for one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub person_id: PersonId,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    #[serde(default)]
    pub busy_kind: BusyKind,
}

impl BusyInterval {
    /// Strict half-open overlap: touching at an endpoint is not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_utc < end && self.end_utc > start
    }
}

/// Supplies busy intervals for a set of people.
#[async_trait]
pub trait IntervalSource: Send + Sync {
    /// Busy intervals overlapping `window`, per person, ordered by start.
    ///
    /// # Errors
    /// Returns `EngineError::AdapterUnavailable` when the source cannot be read.
    async fn list_intervals(
        &self,
        person_ids: &[PersonId],
        window: &TimeWindow,
    ) -> Result<HashMap<PersonId, Vec<BusyInterval>>>;
}

/// An in-process interval source.
///
/// Calendar sync replaces a person's intervals wholesale, which is what
/// [`InMemoryIntervals::replace`] does.
#[derive(Debug)]
pub struct InMemoryIntervals {
    by_person: RwLock<HashMap<PersonId, Vec<BusyInterval>>>,
    online: AtomicBool,
}

impl Default for InMemoryIntervals {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIntervals {
    pub fn new() -> Self {
        Self {
            by_person: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Build a source from a flat list, grouping by `person_id`.
    pub fn from_intervals(intervals: impl IntoIterator<Item = BusyInterval>) -> Self {
        let mut by_person: HashMap<PersonId, Vec<BusyInterval>> = HashMap::new();
        for interval in intervals {
            by_person
                .entry(interval.person_id.clone())
                .or_default()
                .push(interval);
        }
        Self {
            by_person: RwLock::new(by_person),
            online: AtomicBool::new(true),
        }
    }

    /// Drop everything stored for `person_id` and store `intervals` instead.
    pub async fn replace(&self, person_id: &PersonId, intervals: Vec<BusyInterval>) {
        let mut guard = self.by_person.write().await;
        guard.insert(person_id.clone(), intervals);
    }

    /// Simulate the backing store going away (or coming back).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl IntervalSource for InMemoryIntervals {
    async fn list_intervals(
        &self,
        person_ids: &[PersonId],
        window: &TimeWindow,
    ) -> Result<HashMap<PersonId, Vec<BusyInterval>>> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(EngineError::AdapterUnavailable(
                "in-memory interval source is offline".to_string(),
            ));
        }

        let guard = self.by_person.read().await;
        let mut result = HashMap::with_capacity(person_ids.len());
        for id in person_ids {
            let mut intervals: Vec<BusyInterval> = guard
                .get(id)
                .map(|all| {
                    all.iter()
                        .filter(|i| i.overlaps(window.start_utc(), window.end_utc()))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            intervals.sort_by_key(|i| (i.start_utc, i.end_utc));
            result.insert(id.clone(), intervals);
        }
        Ok(result)
    }
}
