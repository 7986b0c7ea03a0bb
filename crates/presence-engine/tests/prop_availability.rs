//! Property-based tests for the grid, the resolver and the aggregators.
//!
//! These check invariants that must hold for *any* window, calendar and
//! presence combination, not just the hand-picked cases in the other suites.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use presence_engine::aggregate::{best_meeting_windows, common_free_times, heatmap, GroupAvailability};
use presence_engine::grid::TimeWindow;
use presence_engine::interval::{BusyInterval, BusyKind, PersonId};
use presence_engine::presence::{PresenceOverride, PresenceStatus};
use presence_engine::resolver::{resolve, SlotVerdict, VerdictReason};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap()
}

const NANOS_PER_MINUTE: i64 = 60_000_000_000;

/// Window of a nanosecond to 3 days, starting anywhere in the first day.
/// Lengths are sub-second, whole minutes, or arbitrary. Resolution is
/// usually 1 to 180 minutes and sometimes decades wide.
fn arb_window() -> impl Strategy<Value = TimeWindow> {
    let length = prop_oneof![
        1i64..1_000_000_000,
        (1i64..4320).prop_map(|m| m * NANOS_PER_MINUTE),
        1i64..4320 * NANOS_PER_MINUTE,
    ];
    let resolution = prop_oneof![4 => 1i64..=180, 1 => 181i64..=50_000_000];
    (0i64..1440 * NANOS_PER_MINUTE, length, resolution).prop_map(|(offset, length, resolution)| {
        let start = base() + Duration::nanoseconds(offset);
        TimeWindow::new(start, start + Duration::nanoseconds(length), resolution).unwrap()
    })
}

fn arb_interval(person: &'static str) -> impl Strategy<Value = BusyInterval> {
    (0i64..4320, 1i64..600, any::<bool>()).prop_map(move |(start, length, soft)| {
        let start_utc = base() + Duration::minutes(start);
        BusyInterval {
            person_id: person.into(),
            start_utc,
            end_utc: start_utc + Duration::minutes(length),
            busy_kind: if soft { BusyKind::Soft } else { BusyKind::Hard },
        }
    })
}

fn arb_status() -> impl Strategy<Value = PresenceStatus> {
    prop_oneof![
        Just(PresenceStatus::Free),
        Just(PresenceStatus::FreeNow),
        Just(PresenceStatus::Busy),
        Just(PresenceStatus::Away),
    ]
}

/// Presence expiring anywhere from an hour before to an hour after `now()`.
fn arb_presence() -> impl Strategy<Value = Option<PresenceOverride>> {
    proptest::option::of((arb_status(), proptest::option::of(-60i64..60)).prop_map(
        |(status, expiry)| PresenceOverride {
            person_id: "p".into(),
            status,
            expires_at: expiry.map(|m| now() + Duration::minutes(m)),
            updated_at: now() - Duration::hours(2),
        },
    ))
}

fn now() -> DateTime<Utc> {
    base() + Duration::hours(12)
}

/// A group of 1-5 people with random free/busy patterns on `window`.
fn arb_group() -> impl Strategy<Value = GroupAvailability> {
    arb_window().prop_flat_map(|window| {
        let slots = window.slot_count();
        proptest::collection::vec(proptest::collection::vec(any::<bool>(), slots), 1..=5)
            .prop_map(move |people| {
                let mut group = GroupAvailability::new(window);
                for (i, frees) in people.into_iter().enumerate() {
                    let verdicts: Vec<SlotVerdict> = frees
                        .into_iter()
                        .map(|free| {
                            if free {
                                SlotVerdict::from(VerdictReason::Free)
                            } else {
                                SlotVerdict::from(VerdictReason::CalendarEvent)
                            }
                        })
                        .collect();
                    group.insert(PersonId(format!("p{i}")), verdicts).unwrap();
                }
                group
            })
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn grid_is_contiguous_and_covers_window(window in arb_window()) {
        let slots: Vec<_> = window.slots().collect();
        prop_assert_eq!(slots.len(), window.slot_count());
        prop_assert_eq!(slots[0].start, window.start_utc());
        prop_assert_eq!(slots.last().unwrap().end, window.end_utc());
        for pair in slots.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }

        let length = window.end_utc() - window.start_utc();
        let covered = window.resolution() * slots.len() as i32;
        prop_assert!(covered >= length);
        prop_assert!(covered < length + window.resolution());
    }

    #[test]
    fn grid_is_restartable(window in arb_window()) {
        let first: Vec<_> = window.slots().collect();
        let second: Vec<_> = window.slots().collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn live_override_dominates_calendar(
        window in arb_window(),
        intervals in proptest::collection::vec(arb_interval("p"), 0..10),
        presence in arb_presence(),
    ) {
        let verdicts = resolve(&"p".into(), &intervals, presence.as_ref(), &window, now());
        prop_assert_eq!(verdicts.len(), window.slot_count());

        let live = presence.as_ref().filter(|p| p.is_live(now()));
        for (slot, v) in window.slots().zip(&verdicts) {
            prop_assert_eq!(v.free, v.reason.is_free());
            match live.map(|p| p.status) {
                Some(PresenceStatus::Free) | Some(PresenceStatus::FreeNow) => prop_assert!(v.free),
                Some(PresenceStatus::Busy) => prop_assert!(!v.free),
                _ => {
                    let overlapped = intervals
                        .iter()
                        .any(|i| i.start_utc < slot.end && i.end_utc > slot.start);
                    prop_assert_eq!(v.free, !overlapped);
                }
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(
        window in arb_window(),
        intervals in proptest::collection::vec(arb_interval("p"), 0..10),
        presence in arb_presence(),
    ) {
        let a = resolve(&"p".into(), &intervals, presence.as_ref(), &window, now());
        let b = resolve(&"p".into(), &intervals, presence.as_ref(), &window, now());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn common_free_is_slotwise_intersection(group in arb_group()) {
        let common: Vec<_> = common_free_times(&group).into_iter().map(|c| c.start).collect();
        let expected: Vec<_> = group
            .window()
            .slots()
            .enumerate()
            .filter(|(i, _)| group.iter().all(|(_, v)| v[*i].free))
            .map(|(_, s)| s.start)
            .collect();
        prop_assert_eq!(common, expected);
    }

    #[test]
    fn heatmap_full_slots_are_common_free(group in arb_group()) {
        let full: Vec<_> = heatmap(&group)
            .into_iter()
            .filter(|e| e.free_count == e.total)
            .map(|e| e.start)
            .collect();
        let common: Vec<_> = common_free_times(&group).into_iter().map(|c| c.start).collect();
        prop_assert_eq!(full, common);
    }

    #[test]
    fn best_windows_are_disjoint_and_exact(
        group in arb_group(),
        duration in prop_oneof![4 => 1i64..300, 1 => 300i64..=i64::MAX],
    ) {
        let windows = best_meeting_windows(&group, duration).unwrap();
        let resolution = group.window().resolution_minutes();
        let required = (duration - 1) / resolution + 1;
        if required > group.window().slot_count() as i64 {
            prop_assert!(windows.is_empty());
        }

        for w in &windows {
            prop_assert_eq!((w.end - w.start).num_minutes(), required * resolution);
            let first = group.window().slot_index_of(w.start).unwrap();
            for index in first..first + required as usize {
                prop_assert!(group.iter().all(|(_, v)| v[index].free));
            }
        }
        for pair in windows.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start);
        }
    }
}
