//! Slot grid -- partitions a time window into fixed-width half-open slots.
//!
//! Slot `i` of a window is `[start + i·resolution, start + (i+1)·resolution)`,
//! clipped to the window end, so the final slot may be shorter than the rest.
//! Slots are aligned to the window start, never to calendar event boundaries.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{EngineError, Result};

const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_MINUTE: i128 = 60 * NANOS_PER_SECOND;

/// A validated query window with its slot resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start_utc: DateTime<Utc>,
    end_utc: DateTime<Utc>,
    resolution_minutes: i64,
    #[serde(skip)]
    resolution: Duration,
}

/// One cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window covering `[start_utc, end_utc)`.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidWindow` if `resolution_minutes <= 0`, if
    /// it is too large to express as a duration, or if `end_utc <= start_utc`.
    pub fn new(
        start_utc: DateTime<Utc>,
        end_utc: DateTime<Utc>,
        resolution_minutes: i64,
    ) -> Result<Self> {
        let resolution = resolution_delta(resolution_minutes)?;
        if end_utc <= start_utc {
            return Err(EngineError::InvalidWindow(format!(
                "window end {} is not after start {}",
                end_utc.to_rfc3339(),
                start_utc.to_rfc3339()
            )));
        }
        Ok(Self {
            start_utc,
            end_utc,
            resolution_minutes,
            resolution,
        })
    }

    /// The local calendar day `date` in `tz`, midnight to midnight.
    ///
    /// With a 60 minute resolution this is the classic "hour of the day" view.
    /// DST days produce 23 or 25 slots.
    pub fn local_day(date: NaiveDate, tz: Tz, resolution_minutes: i64) -> Result<Self> {
        let next = date
            .succ_opt()
            .ok_or_else(|| EngineError::InvalidWindow(format!("no day after {}", date)))?;
        let start = local_midnight(date, tz)?;
        let end = local_midnight(next, tz)?;
        Self::new(start, end, resolution_minutes)
    }

    /// The single epoch-aligned slot of width `resolution_minutes` that
    /// contains `instant`.
    pub fn containing(instant: DateTime<Utc>, resolution_minutes: i64) -> Result<Self> {
        let resolution = resolution_delta(resolution_minutes)?;
        let out_of_range = || {
            EngineError::InvalidWindow(format!(
                "no {} minute slot contains {}",
                resolution_minutes,
                instant.to_rfc3339()
            ))
        };
        let width = resolution.num_seconds();
        let floored = instant.timestamp().div_euclid(width) * width;
        let start = DateTime::from_timestamp(floored, 0).ok_or_else(out_of_range)?;
        let end = start.checked_add_signed(resolution).ok_or_else(out_of_range)?;
        Self::new(start, end, resolution_minutes)
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start_utc
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end_utc
    }

    pub fn resolution_minutes(&self) -> i64 {
        self.resolution_minutes
    }

    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    /// `⌈(end - start) / resolution⌉`, exact to the nanosecond.
    pub fn slot_count(&self) -> usize {
        let length = self.length_nanos();
        let width = self.width_nanos();
        usize::try_from((length + width - 1) / width).unwrap_or(usize::MAX)
    }

    /// The `index`-th slot, or `None` past the end of the grid.
    pub fn slot(&self, index: usize) -> Option<Slot> {
        if index >= self.slot_count() {
            return None;
        }
        let width = self.width_nanos();
        let offset = width * index as i128;
        let start = self.start_utc.checked_add_signed(from_nanos(offset)?)?;
        let end = if self.length_nanos() - offset <= width {
            self.end_utc
        } else {
            start.checked_add_signed(self.resolution)?
        };
        Some(Slot { start, end })
    }

    /// Index of the slot containing `instant`, if it falls inside the window.
    pub fn slot_index_of(&self, instant: DateTime<Utc>) -> Option<usize> {
        if instant < self.start_utc || instant >= self.end_utc {
            return None;
        }
        let offset = nanos(instant - self.start_utc);
        usize::try_from(offset / self.width_nanos()).ok()
    }

    /// Iterate the grid. Each call starts again from the first slot.
    pub fn slots(&self) -> Slots {
        Slots {
            window: *self,
            next: 0,
            count: self.slot_count(),
        }
    }

    fn length_nanos(&self) -> i128 {
        nanos(self.end_utc - self.start_utc)
    }

    fn width_nanos(&self) -> i128 {
        self.resolution_minutes as i128 * NANOS_PER_MINUTE
    }
}

fn resolution_delta(resolution_minutes: i64) -> Result<Duration> {
    if resolution_minutes <= 0 {
        return Err(EngineError::InvalidWindow(format!(
            "resolution_minutes must be positive, got {}",
            resolution_minutes
        )));
    }
    Duration::try_minutes(resolution_minutes).ok_or_else(|| {
        EngineError::InvalidWindow(format!(
            "resolution_minutes {} is out of range",
            resolution_minutes
        ))
    })
}

fn nanos(delta: Duration) -> i128 {
    delta.num_seconds() as i128 * NANOS_PER_SECOND + delta.subsec_nanos() as i128
}

fn from_nanos(total: i128) -> Option<Duration> {
    let secs = i64::try_from(total.div_euclid(NANOS_PER_SECOND)).ok()?;
    Duration::new(secs, total.rem_euclid(NANOS_PER_SECOND) as u32)
}

fn local_midnight(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| EngineError::InvalidWindow(format!("no midnight on {}", date)))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            EngineError::InvalidWindow(format!("midnight of {} does not exist in {}", date, tz))
        })
}

/// Lazy iterator over the slots of a [`TimeWindow`].
#[derive(Debug, Clone)]
pub struct Slots {
    window: TimeWindow,
    next: usize,
    count: usize,
}

impl Iterator for Slots {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        let slot = self.window.slot(self.next)?;
        self.next += 1;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Slots {}
