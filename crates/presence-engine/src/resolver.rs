//! Per-person availability resolution.
//!
//! For one person and one grid, produces one [`SlotVerdict`] per slot. A live
//! presence record outranks calendar data for the whole window; without one,
//! a slot is busy iff some busy interval strictly overlaps it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::trace;

use crate::grid::TimeWindow;
use crate::interval::{BusyInterval, PersonId};
use crate::presence::{PresenceOverride, PresenceStatus};

/// Why a slot got its verdict. Exactly one per verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// No presence override and no overlapping busy interval.
    Free,
    /// A busy interval overlaps the slot.
    CalendarEvent,
    /// Live `FREE_NOW` presence.
    FreeNow,
    /// Live `FREE` presence.
    PresenceOverride,
    /// Live `BUSY` presence.
    PresenceBusy,
}

impl VerdictReason {
    /// The `free` value this reason implies.
    pub fn is_free(&self) -> bool {
        matches!(
            self,
            VerdictReason::Free | VerdictReason::FreeNow | VerdictReason::PresenceOverride
        )
    }
}

/// Free/busy verdict for one person in one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotVerdict {
    pub free: bool,
    pub reason: VerdictReason,
}

impl From<VerdictReason> for SlotVerdict {
    fn from(reason: VerdictReason) -> Self {
        Self {
            free: reason.is_free(),
            reason,
        }
    }
}

/// Resolve one person's verdicts over every slot of `window`, in slot order.
///
/// `presence` liveness is judged once against `now`: presence does not change
/// mid-query. An `AWAY` status carries no override and falls through to the
/// calendar. `busy_kind` is not consulted; `SOFT` blocks like `HARD`.
pub fn resolve(
    person_id: &PersonId,
    intervals: &[BusyInterval],
    presence: Option<&PresenceOverride>,
    window: &TimeWindow,
    now: DateTime<Utc>,
) -> Vec<SlotVerdict> {
    let override_reason = presence
        .filter(|p| p.is_live(now))
        .and_then(|p| match p.status {
            PresenceStatus::FreeNow => Some(VerdictReason::FreeNow),
            PresenceStatus::Free => Some(VerdictReason::PresenceOverride),
            PresenceStatus::Busy => Some(VerdictReason::PresenceBusy),
            PresenceStatus::Away => None,
        });

    if let Some(reason) = override_reason {
        trace!(person = %person_id, ?reason, "presence overrides calendar");
        return vec![SlotVerdict::from(reason); window.slot_count()];
    }

    window
        .slots()
        .map(|slot| {
            let busy = intervals.iter().any(|i| i.overlaps(slot.start, slot.end));
            if busy {
                SlotVerdict::from(VerdictReason::CalendarEvent)
            } else {
                SlotVerdict::from(VerdictReason::Free)
            }
        })
        .collect()
}
