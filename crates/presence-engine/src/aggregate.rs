//! Group-level views built from per-person verdicts on one shared grid.
//!
//! Nothing here touches calendar data or presence: every function reads the
//! verdict sequences already produced by [`crate::resolver::resolve`].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::grid::TimeWindow;
use crate::interval::PersonId;
use crate::resolver::SlotVerdict;

/// Every person's verdicts, all aligned to the same [`TimeWindow`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAvailability {
    window: TimeWindow,
    verdicts: BTreeMap<PersonId, Vec<SlotVerdict>>,
}

/// A slot at which the whole group is free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonFreeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub free_count: usize,
    pub total: usize,
}

/// Free-person density for one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapEntry {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub free_count: usize,
    pub total: usize,
    /// `100 · free_count / total`, or 0 for an empty group.
    pub percentage: f64,
}

/// A candidate meeting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
    pub participants: usize,
}

impl GroupAvailability {
    /// An empty group on `window`.
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            verdicts: BTreeMap::new(),
        }
    }

    /// Add one person's verdicts.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidWindow` if the sequence length does not
    /// match the grid, i.e. it was resolved against a different window.
    pub fn insert(&mut self, person_id: PersonId, verdicts: Vec<SlotVerdict>) -> Result<()> {
        if verdicts.len() != self.window.slot_count() {
            return Err(EngineError::InvalidWindow(format!(
                "{} verdicts for {} do not match a grid of {} slots",
                verdicts.len(),
                person_id,
                self.window.slot_count()
            )));
        }
        self.verdicts.insert(person_id, verdicts);
        Ok(())
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn verdicts(&self, person_id: &PersonId) -> Option<&[SlotVerdict]> {
        self.verdicts.get(person_id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PersonId, &[SlotVerdict])> {
        self.verdicts.iter().map(|(id, v)| (id, v.as_slice()))
    }

    /// Number of people free at slot `index`.
    fn free_count_at(&self, index: usize) -> usize {
        self.verdicts.values().filter(|v| v[index].free).count()
    }

    fn all_free_at(&self, index: usize) -> bool {
        self.verdicts.values().all(|v| v[index].free)
    }
}

/// Slots at which every person in the group is free, in slot order.
///
/// An empty group is vacuously free everywhere.
pub fn common_free_times(group: &GroupAvailability) -> Vec<CommonFreeSlot> {
    let total = group.len();
    group
        .window
        .slots()
        .enumerate()
        .filter(|(i, _)| group.all_free_at(*i))
        .map(|(_, slot)| CommonFreeSlot {
            start: slot.start,
            end: slot.end,
            free_count: total,
            total,
        })
        .collect()
}

/// One entry per slot with the count and share of free people.
pub fn heatmap(group: &GroupAvailability) -> Vec<HeatmapEntry> {
    let total = group.len();
    group
        .window
        .slots()
        .enumerate()
        .map(|(i, slot)| {
            let free_count = group.free_count_at(i);
            let percentage = if total > 0 {
                free_count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            HeatmapEntry {
                start: slot.start,
                end: slot.end,
                free_count,
                total,
                percentage,
            }
        })
        .collect()
}

/// Non-overlapping runs of `⌈duration / resolution⌉` slots at which the whole
/// group is free.
///
/// Scans left to right. Once a run reaches the required length it is emitted
/// and scanning restarts right after it, so no slot starts two candidates. A
/// shorter run broken by a busy slot yields nothing.
///
/// A duration longer than the whole grid finds nothing.
///
/// # Errors
/// Returns `EngineError::InvalidWindow` if `duration_minutes <= 0`.
pub fn best_meeting_windows(
    group: &GroupAvailability,
    duration_minutes: i64,
) -> Result<Vec<MeetingWindow>> {
    if duration_minutes <= 0 {
        return Err(EngineError::InvalidWindow(format!(
            "meeting duration must be positive, got {}",
            duration_minutes
        )));
    }

    let window = &group.window;
    let resolution = window.resolution_minutes();
    let required = (duration_minutes - 1) / resolution + 1;
    let slot_count = window.slot_count();
    let required = match usize::try_from(required) {
        Ok(r) if r <= slot_count => r,
        _ => return Ok(Vec::new()),
    };
    let out_of_range = || {
        EngineError::InvalidWindow(format!(
            "meeting duration of {} minutes is out of range",
            duration_minutes
        ))
    };
    let span = (required as i64)
        .checked_mul(resolution)
        .and_then(Duration::try_minutes)
        .ok_or_else(out_of_range)?;

    let mut windows = Vec::new();
    let mut run_start: Option<usize> = None;

    for index in 0..slot_count {
        if !group.all_free_at(index) {
            run_start = None;
            continue;
        }
        let start = *run_start.get_or_insert(index);
        if index + 1 - start == required {
            if let Some(slot) = window.slot(start) {
                windows.push(MeetingWindow {
                    start: slot.start,
                    end: slot.start.checked_add_signed(span).ok_or_else(out_of_range)?,
                    duration_minutes,
                    participants: group.len(),
                });
            }
            run_start = None;
        }
    }

    Ok(windows)
}

/// People whose verdict is free in the slot containing `instant`, in id order.
/// Empty when `instant` lies outside the window.
pub fn free_persons_at(group: &GroupAvailability, instant: DateTime<Utc>) -> Vec<PersonId> {
    let Some(index) = group.window.slot_index_of(instant) else {
        return Vec::new();
    };
    group
        .verdicts
        .iter()
        .filter(|(_, v)| v[index].free)
        .map(|(id, _)| id.clone())
        .collect()
}
