//! Tests for per-person slot resolution: calendar overlap and presence precedence.

use chrono::{DateTime, Duration, TimeZone, Utc};
use presence_engine::grid::TimeWindow;
use presence_engine::interval::{BusyInterval, BusyKind, PersonId};
use presence_engine::presence::{PresenceOverride, PresenceStatus};
use presence_engine::resolver::{resolve, SlotVerdict, VerdictReason};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, hour, minute, 0).unwrap()
}

fn day_window(resolution_minutes: i64) -> TimeWindow {
    TimeWindow::new(
        at(0, 0),
        Utc.with_ymd_and_hms(2026, 3, 17, 0, 0, 0).unwrap(),
        resolution_minutes,
    )
    .unwrap()
}

fn busy(person: &str, start: DateTime<Utc>, end: DateTime<Utc>, kind: BusyKind) -> BusyInterval {
    BusyInterval {
        person_id: person.into(),
        start_utc: start,
        end_utc: end,
        busy_kind: kind,
    }
}

fn presence(
    person: &str,
    status: PresenceStatus,
    expires_at: Option<DateTime<Utc>>,
) -> PresenceOverride {
    PresenceOverride {
        person_id: person.into(),
        status,
        expires_at,
        updated_at: at(7, 0),
    }
}

fn now() -> DateTime<Utc> {
    at(8, 0)
}

const FREE: SlotVerdict = SlotVerdict {
    free: true,
    reason: VerdictReason::Free,
};

const CALENDAR: SlotVerdict = SlotVerdict {
    free: false,
    reason: VerdictReason::CalendarEvent,
};

// ── Calendar only ───────────────────────────────────────────────────────────

#[test]
fn single_hard_interval_blocks_its_hour() {
    let a = PersonId::from("a");
    let intervals = vec![busy("a", at(10, 0), at(11, 0), BusyKind::Hard)];
    let window = day_window(60);

    let verdicts = resolve(&a, &intervals, None, &window, now());

    assert_eq!(verdicts.len(), 24);
    for (hour, verdict) in verdicts.iter().enumerate() {
        if hour == 10 {
            assert_eq!(*verdict, CALENDAR, "10:00 slot should be busy");
        } else {
            assert_eq!(*verdict, FREE, "slot {hour}:00 should be free");
        }
    }
}

#[test]
fn no_intervals_and_no_presence_is_free_everywhere() {
    let verdicts = resolve(&"a".into(), &[], None, &day_window(15), now());
    assert_eq!(verdicts.len(), 96);
    assert!(verdicts.iter().all(|v| *v == FREE));
}

#[test]
fn touching_intervals_do_not_block_neighbour_slots() {
    // [10:00, 11:00) must not mark 09:00 or 11:00 busy.
    let intervals = vec![busy("a", at(10, 0), at(11, 0), BusyKind::Hard)];
    let verdicts = resolve(&"a".into(), &intervals, None, &day_window(60), now());
    assert_eq!(verdicts[9], FREE);
    assert_eq!(verdicts[11], FREE);
}

#[test]
fn partial_overlap_blocks_the_whole_slot() {
    let intervals = vec![busy("a", at(10, 50), at(11, 5), BusyKind::Hard)];
    let verdicts = resolve(&"a".into(), &intervals, None, &day_window(60), now());
    assert_eq!(verdicts[10], CALENDAR);
    assert_eq!(verdicts[11], CALENDAR);
    assert_eq!(verdicts[12], FREE);
}

#[test]
fn soft_intervals_block_like_hard_ones() {
    let hard = vec![busy("a", at(14, 0), at(15, 0), BusyKind::Hard)];
    let soft = vec![busy("a", at(14, 0), at(15, 0), BusyKind::Soft)];
    let window = day_window(30);

    assert_eq!(
        resolve(&"a".into(), &hard, None, &window, now()),
        resolve(&"a".into(), &soft, None, &window, now())
    );
}

// ── Presence precedence ─────────────────────────────────────────────────────

#[test]
fn free_now_presence_ignores_calendar() {
    let intervals = vec![busy("b", at(10, 0), at(11, 0), BusyKind::Hard)];
    let p = presence("b", PresenceStatus::FreeNow, None);

    let verdicts = resolve(&"b".into(), &intervals, Some(&p), &day_window(60), now());

    assert_eq!(verdicts.len(), 24);
    assert!(verdicts.iter().all(|v| *v
        == SlotVerdict {
            free: true,
            reason: VerdictReason::FreeNow
        }));
}

#[test]
fn free_presence_reports_presence_override() {
    let intervals = vec![busy("b", at(10, 0), at(11, 0), BusyKind::Hard)];
    let p = presence("b", PresenceStatus::Free, Some(at(18, 0)));

    let verdicts = resolve(&"b".into(), &intervals, Some(&p), &day_window(60), now());

    assert!(verdicts
        .iter()
        .all(|v| v.free && v.reason == VerdictReason::PresenceOverride));
}

#[test]
fn busy_presence_blocks_empty_calendar() {
    let p = presence("c", PresenceStatus::Busy, None);
    let verdicts = resolve(&"c".into(), &[], Some(&p), &day_window(60), now());
    assert!(verdicts
        .iter()
        .all(|v| !v.free && v.reason == VerdictReason::PresenceBusy));
}

#[test]
fn live_presence_covers_slots_after_its_expiry() {
    // Liveness is judged once, at query time, not per slot.
    let p = presence("b", PresenceStatus::Busy, Some(at(9, 0)));
    let verdicts = resolve(&"b".into(), &[], Some(&p), &day_window(60), now());
    assert!(verdicts.iter().all(|v| v.reason == VerdictReason::PresenceBusy));
}

#[test]
fn away_falls_through_to_calendar() {
    let intervals = vec![busy("d", at(10, 0), at(11, 0), BusyKind::Hard)];
    let p = presence("d", PresenceStatus::Away, None);

    let with_away = resolve(&"d".into(), &intervals, Some(&p), &day_window(60), now());
    let without = resolve(&"d".into(), &intervals, None, &day_window(60), now());

    assert_eq!(with_away, without);
}

#[test]
fn expired_presence_is_treated_as_absent() {
    let intervals = vec![busy("e", at(10, 0), at(11, 0), BusyKind::Hard)];
    let p = presence("e", PresenceStatus::FreeNow, Some(now() - Duration::seconds(1)));

    let verdicts = resolve(&"e".into(), &intervals, Some(&p), &day_window(60), now());

    assert_eq!(verdicts[10], CALENDAR);
    assert_eq!(verdicts[9], FREE);
}

#[test]
fn presence_expiring_exactly_now_is_still_live() {
    let p = presence("e", PresenceStatus::Busy, Some(now()));
    let verdicts = resolve(&"e".into(), &[], Some(&p), &day_window(60), now());
    assert!(verdicts.iter().all(|v| !v.free));
}

// ── Determinism ─────────────────────────────────────────────────────────────

#[test]
fn resolution_is_idempotent() {
    let intervals = vec![
        busy("a", at(9, 15), at(10, 0), BusyKind::Hard),
        busy("a", at(13, 0), at(14, 30), BusyKind::Soft),
    ];
    let window = day_window(15);
    let first = resolve(&"a".into(), &intervals, None, &window, now());
    let second = resolve(&"a".into(), &intervals, None, &window, now());
    assert_eq!(first, second);
}

#[test]
fn every_reason_agrees_with_its_free_flag() {
    let intervals = vec![busy("a", at(10, 0), at(11, 0), BusyKind::Hard)];
    let window = day_window(60);
    let cases = [
        None,
        Some(presence("a", PresenceStatus::Free, None)),
        Some(presence("a", PresenceStatus::FreeNow, None)),
        Some(presence("a", PresenceStatus::Busy, None)),
        Some(presence("a", PresenceStatus::Away, None)),
    ];
    for p in &cases {
        for v in resolve(&"a".into(), &intervals, p.as_ref(), &window, now()) {
            assert_eq!(v.free, v.reason.is_free());
        }
    }
}

#[test]
fn verdict_serializes_reason_in_snake_case() {
    let json = serde_json::to_value(CALENDAR).unwrap();
    assert_eq!(json, serde_json::json!({"free": false, "reason": "calendar_event"}));
}
