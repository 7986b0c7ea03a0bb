//! # presence-engine
//!
//! Availability and presence resolution for group scheduling.
//!
//! Two sources of truth describe whether a person is free: durable busy
//! intervals derived from their calendars, and an ephemeral presence status
//! ("free now", "busy") that a person asserts and that expires on its own.
//! This crate folds both into one free/busy verdict per slot of a fixed grid,
//! then aggregates verdicts across a group without re-reading calendar data.
//!
//! ## Modules
//!
//! - [`grid`] — `TimeWindow` → contiguous half-open slots
//! - [`interval`] — busy intervals and the `IntervalSource` seam
//! - [`presence`] — presence overrides, liveness, and the `PresenceStore` seam
//! - [`resolver`] — one person × one grid → ordered slot verdicts
//! - [`aggregate`] — common free times, heat-map, best meeting windows
//! - [`propagator`] — "presence changed" notifications over a broadcast channel
//! - [`engine`] — wires the collaborators together for queries and presence writes
//! - [`clock`] — injectable time source
//! - [`config`] — engine defaults
//! - [`error`] — Error types

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod interval;
pub mod presence;
pub mod propagator;
pub mod resolver;

pub use aggregate::{
    best_meeting_windows, common_free_times, free_persons_at, heatmap, CommonFreeSlot,
    GroupAvailability, HeatmapEntry, MeetingWindow,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{AvailabilityEngine, GroupReport, PresenceLookup, PresenceMode, PresenceUpdate};
pub use error::EngineError;
pub use grid::{Slot, TimeWindow};
pub use interval::{BusyInterval, BusyKind, InMemoryIntervals, IntervalSource, PersonId};
pub use presence::memory::InMemoryPresenceStore;
pub use presence::{PresenceOverride, PresenceStatus, PresenceStore};
pub use propagator::{BroadcastNotifier, Delivery, PresenceChanged, PresenceNotifier, PublishError};
pub use resolver::{resolve, SlotVerdict, VerdictReason};
