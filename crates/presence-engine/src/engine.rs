//! The availability engine: collaborators in, verdicts and aggregates out.
//!
//! A query reads busy intervals and presence concurrently, builds the grid
//! once, resolves every person against it and hands the verdicts to the
//! aggregators. A presence write goes to the store, then is announced once on
//! the notifier.
//!
//! Presence-store failures on the read path degrade to calendar-only
//! resolution and are reported as [`PresenceMode::Degraded`]. Interval-source
//! failures fail the whole query: a missing interval would read as "free".

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::{self, CommonFreeSlot, GroupAvailability, HeatmapEntry, MeetingWindow};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::grid::TimeWindow;
use crate::interval::{IntervalSource, PersonId};
use crate::presence::{PresenceOverride, PresenceStatus, PresenceStore};
use crate::propagator::{Delivery, PresenceChanged, PresenceNotifier};
use crate::resolver;

/// Whether presence took part in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceMode {
    /// Presence was read successfully (possibly finding no records).
    Live,
    /// The presence store was unreachable; verdicts are calendar-only.
    Degraded,
}

/// Result of a single-person presence lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceLookup {
    Live(PresenceOverride),
    /// The store answered and holds no live record.
    Absent,
    /// The store did not answer.
    Unavailable,
}

impl PresenceLookup {
    pub fn record(&self) -> Option<&PresenceOverride> {
        match self {
            PresenceLookup::Live(record) => Some(record),
            _ => None,
        }
    }
}

/// Outcome of a presence write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceUpdate {
    pub presence: PresenceOverride,
    pub delivery: Delivery,
}

/// Everything a group view needs, from one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub presence_mode: PresenceMode,
    pub availability: GroupAvailability,
    pub heatmap: Vec<HeatmapEntry>,
    pub common_free_times: Vec<CommonFreeSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_meeting_windows: Option<Vec<MeetingWindow>>,
}

pub struct AvailabilityEngine {
    intervals: Arc<dyn IntervalSource>,
    presence: Arc<dyn PresenceStore>,
    notifier: Arc<dyn PresenceNotifier>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl AvailabilityEngine {
    pub fn new(
        intervals: Arc<dyn IntervalSource>,
        presence: Arc<dyn PresenceStore>,
        notifier: Arc<dyn PresenceNotifier>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            intervals,
            presence,
            notifier,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a window, falling back to the configured resolution.
    pub fn window(
        &self,
        start_utc: DateTime<Utc>,
        end_utc: DateTime<Utc>,
        resolution_minutes: Option<i64>,
    ) -> Result<TimeWindow> {
        TimeWindow::new(
            start_utc,
            end_utc,
            resolution_minutes.unwrap_or(self.config.default_resolution_minutes),
        )
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Resolve every person in `person_ids` against `window`.
    ///
    /// # Errors
    /// Returns `EngineError::AdapterUnavailable` if busy intervals cannot be
    /// read. No partial result is produced in that case.
    #[instrument(skip(self, person_ids), fields(people = person_ids.len()))]
    pub async fn group_availability(
        &self,
        person_ids: &[PersonId],
        window: &TimeWindow,
    ) -> Result<(GroupAvailability, PresenceMode)> {
        let (intervals, presences) = tokio::join!(
            self.intervals.list_intervals(person_ids, window),
            self.presence.get_many(person_ids),
        );
        let intervals = intervals?;
        let (presences, mode) = match presences {
            Ok(found) => (found, PresenceMode::Live),
            Err(e) => {
                warn!(error = %e, "presence store unreachable, resolving from calendar only");
                (HashMap::new(), PresenceMode::Degraded)
            }
        };

        let now = self.clock.now();
        let mut group = GroupAvailability::new(*window);
        for id in person_ids {
            let verdicts = resolver::resolve(
                id,
                intervals.get(id).map(Vec::as_slice).unwrap_or(&[]),
                presences.get(id),
                window,
                now,
            );
            group.insert(id.clone(), verdicts)?;
        }

        debug!(
            slots = window.slot_count(),
            live_presences = presences.len(),
            "resolved group availability"
        );
        Ok((group, mode))
    }

    pub async fn common_free_times(
        &self,
        person_ids: &[PersonId],
        window: &TimeWindow,
    ) -> Result<Vec<CommonFreeSlot>> {
        let (group, _) = self.group_availability(person_ids, window).await?;
        Ok(aggregate::common_free_times(&group))
    }

    pub async fn heatmap(
        &self,
        person_ids: &[PersonId],
        window: &TimeWindow,
    ) -> Result<Vec<HeatmapEntry>> {
        let (group, _) = self.group_availability(person_ids, window).await?;
        Ok(aggregate::heatmap(&group))
    }

    pub async fn best_meeting_windows(
        &self,
        person_ids: &[PersonId],
        window: &TimeWindow,
        duration_minutes: i64,
    ) -> Result<Vec<MeetingWindow>> {
        if duration_minutes <= 0 {
            return Err(EngineError::InvalidWindow(format!(
                "meeting duration must be positive, got {}",
                duration_minutes
            )));
        }
        let (group, _) = self.group_availability(person_ids, window).await?;
        aggregate::best_meeting_windows(&group, duration_minutes)
    }

    /// Verdicts plus every aggregate from a single read of the collaborators.
    pub async fn group_report(
        &self,
        person_ids: &[PersonId],
        window: &TimeWindow,
        duration_minutes: Option<i64>,
    ) -> Result<GroupReport> {
        let (availability, presence_mode) = self.group_availability(person_ids, window).await?;
        let best_meeting_windows = duration_minutes
            .map(|d| aggregate::best_meeting_windows(&availability, d))
            .transpose()?;
        Ok(GroupReport {
            presence_mode,
            heatmap: aggregate::heatmap(&availability),
            common_free_times: aggregate::common_free_times(&availability),
            best_meeting_windows,
            availability,
        })
    }

    /// People free in the epoch-aligned slot that contains the current instant.
    pub async fn free_now(
        &self,
        person_ids: &[PersonId],
        resolution_minutes: Option<i64>,
    ) -> Result<Vec<PersonId>> {
        let now = self.clock.now();
        let window = TimeWindow::containing(
            now,
            resolution_minutes.unwrap_or(self.config.default_resolution_minutes),
        )?;
        let (group, _) = self.group_availability(person_ids, &window).await?;
        Ok(aggregate::free_persons_at(&group, now))
    }

    // -----------------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------------

    /// Look up one person's presence, keeping "no record" and "store down"
    /// apart.
    pub async fn presence(&self, person_id: &PersonId) -> PresenceLookup {
        match self.presence.get(person_id).await {
            Ok(Some(record)) => PresenceLookup::Live(record),
            Ok(None) => PresenceLookup::Absent,
            Err(e) => {
                warn!(person = %person_id, error = %e, "presence lookup failed");
                PresenceLookup::Unavailable
            }
        }
    }

    /// Parse `status` and write it.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidStatus` before touching the store if
    /// `status` is not in the vocabulary, and `EngineError::StoreUnavailable`
    /// if the write does not land.
    pub async fn update_presence(
        &self,
        person_id: &PersonId,
        status: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PresenceUpdate> {
        let status: PresenceStatus = status.parse()?;
        self.set_presence(person_id, status, expires_at).await
    }

    /// Write a presence record, then announce it once.
    ///
    /// A failed announcement is reported in [`PresenceUpdate::delivery`] and
    /// does not undo the write.
    #[instrument(skip(self, person_id), fields(person = %person_id))]
    pub async fn set_presence(
        &self,
        person_id: &PersonId,
        status: PresenceStatus,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PresenceUpdate> {
        let presence = self.presence.set(person_id, status, expires_at).await?;
        info!(%status, expires_at = ?presence.expires_at, "presence updated");

        let delivery = match self.notifier.publish(&PresenceChanged::from(&presence)) {
            Ok(receivers) => Delivery::Published { receivers },
            Err(e) => {
                warn!(error = %e, "presence change not propagated");
                Delivery::Failed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(PresenceUpdate { presence, delivery })
    }

    /// Mark a person `FREE_NOW` until `until`, or for the configured
    /// done-early period.
    pub async fn done_early(
        &self,
        person_id: &PersonId,
        until: Option<DateTime<Utc>>,
    ) -> Result<PresenceUpdate> {
        let expires_at = match until {
            Some(until) => until,
            None => Duration::try_minutes(self.config.done_early_minutes)
                .and_then(|period| self.clock.now().checked_add_signed(period))
                .ok_or_else(|| {
                    EngineError::InvalidConfig(format!(
                        "done_early_minutes {} is out of range",
                        self.config.done_early_minutes
                    ))
                })?,
        };
        self.set_presence(person_id, PresenceStatus::FreeNow, Some(expires_at))
            .await
    }

    pub async fn clear_presence(&self, person_id: &PersonId) -> Result<()> {
        self.presence.clear(person_id).await?;
        info!(person = %person_id, "presence cleared");
        Ok(())
    }
}
