//! Bookable-slot generation and interval overlap math.
//!
//! All interval comparisons are half-open: `[start, end)`. Two intervals
//! conflict iff `a.start < b.end && a.end > b.start`, so an exact
//! boundary touch (one ends exactly when the other starts) is not a
//! conflict. Slot generation and the single-candidate check share the
//! same window resolution so booking can never accept a slot that
//! `generate_slots` would not have offered.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::Serialize;

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A candidate bookable interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// An occupied interval (an existing requested/confirmed appointment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// A recurring weekly availability window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyWindow {
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// A date-specific replacement of (or block on) the weekly windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOverride {
    /// The whole date is blocked regardless of weekly windows.
    Unavailable,
    /// These hours replace the weekly windows for this date only.
    CustomHours {
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

/// Half-open interval overlap. A boundary touch is not an overlap.
pub fn overlaps(
    a_start: Timestamp,
    a_end: Timestamp,
    b_start: Timestamp,
    b_end: Timestamp,
) -> bool {
    a_start < b_end && a_end > b_start
}

// ---------------------------------------------------------------------------
// Window resolution
// ---------------------------------------------------------------------------

/// Resolve the bookable windows for a date.
///
/// Precedence: an `Unavailable` override blanks the date; a
/// `CustomHours` override replaces the weekly windows entirely;
/// otherwise the weekly windows matching the date's weekday apply.
pub fn windows_for_date(
    weekly: &[WeeklyWindow],
    day_override: Option<&DayOverride>,
    date: NaiveDate,
) -> Vec<(NaiveTime, NaiveTime)> {
    match day_override {
        Some(DayOverride::Unavailable) => Vec::new(),
        Some(DayOverride::CustomHours {
            start_time,
            end_time,
        }) => vec![(*start_time, *end_time)],
        None => weekly
            .iter()
            .filter(|w| w.weekday == date.weekday())
            .map(|w| (w.start_time, w.end_time))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Slot generation
// ---------------------------------------------------------------------------

/// Walk each window of `date` in `duration_minutes` increments and keep
/// the candidates that fit inside the window, start strictly after
/// `now`, and do not overlap any busy interval.
pub fn generate_slots(
    windows: &[(NaiveTime, NaiveTime)],
    date: NaiveDate,
    duration_minutes: i32,
    busy: &[BusyInterval],
    now: Timestamp,
) -> Vec<Slot> {
    if duration_minutes <= 0 {
        return Vec::new();
    }
    let duration = Duration::minutes(i64::from(duration_minutes));
    let mut slots = Vec::new();

    for &(window_start, window_end) in windows {
        if window_end <= window_start {
            continue;
        }
        let window_end = date.and_time(window_end).and_utc();
        let mut cursor = date.and_time(window_start).and_utc();

        while cursor + duration <= window_end {
            let candidate = Slot {
                start: cursor,
                end: cursor + duration,
            };
            if candidate.start > now && !conflicts(candidate, busy) {
                slots.push(candidate);
            }
            cursor += duration;
        }
    }

    slots
}

/// Check a single candidate interval against the resolved windows and
/// busy intervals. Mirrors [`generate_slots`] for one start time, except
/// the candidate does not need to fall on a walk increment.
pub fn candidate_fits(
    windows: &[(NaiveTime, NaiveTime)],
    date: NaiveDate,
    start: Timestamp,
    duration_minutes: i32,
    busy: &[BusyInterval],
    now: Timestamp,
) -> bool {
    if duration_minutes <= 0 || start <= now {
        return false;
    }
    let end = start + Duration::minutes(i64::from(duration_minutes));

    let inside_some_window = windows.iter().any(|&(window_start, window_end)| {
        let window_start = date.and_time(window_start).and_utc();
        let window_end = date.and_time(window_end).and_utc();
        start >= window_start && end <= window_end
    });

    inside_some_window && !conflicts(Slot { start, end }, busy)
}

fn conflicts(candidate: Slot, busy: &[BusyInterval]) -> bool {
    busy.iter()
        .any(|b| overlaps(candidate.start, candidate.end, b.start, b.end))
}
