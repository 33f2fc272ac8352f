//! Enumerate bookable start times for an event type on one date.
//!
//! Candidates start at the window's opening time and advance by
//! [`SLOT_STEP_MINUTES`] while `start + duration <= window.end`. A candidate is
//! emitted unless its buffer-expanded occupancy overlaps a booked meeting's
//! (see [`crate::conflict`]). Enumeration order is ascending, so no sort is needed.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::conflict;
use crate::model::{EventType, Meeting};
use crate::time::{ClockTime, DailyWindow};

/// Step between candidate start times, shared by listing and booking.
pub const SLOT_STEP_MINUTES: u32 = 15;

fn step() -> Duration {
    Duration::minutes(i64::from(SLOT_STEP_MINUTES))
}

/// Lazy, finite sequence of open start times. Clone it to restart from the
/// current position; call [`generate_slots`] again to restart from the top.
#[derive(Debug, Clone)]
pub struct Slots<'a> {
    event_type: &'a EventType,
    booked: &'a [Meeting],
    next: Option<NaiveDateTime>,
    last_start: NaiveDateTime,
}

impl Iterator for Slots<'_> {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<NaiveDateTime> {
        while let Some(start) = self.next {
            if start > self.last_start {
                self.next = None;
                break;
            }
            self.next = Some(start + step());
            let end = start + self.event_type.duration();
            if conflict::is_available(self.event_type, start, end, self.booked) {
                return Some(start);
            }
        }
        None
    }
}

/// Bookable start times for `event_type` on `date`.
///
/// A `None` window (the host has no hours that day) yields an empty sequence.
/// `booked` may contain meetings of other event types; they are ignored.
pub fn generate_slots<'a>(
    window: Option<&DailyWindow>,
    event_type: &'a EventType,
    booked: &'a [Meeting],
    date: NaiveDate,
) -> Slots<'a> {
    let (next, last_start) = match window {
        Some(window) => {
            let range = window.on(date);
            (Some(range.start), range.end - event_type.duration())
        }
        None => (None, NaiveDateTime::MIN),
    };
    Slots {
        event_type,
        booked,
        next,
        last_start,
    }
}

/// Whether the listing would ever enumerate `start` as a candidate: on the
/// step grid from the window's opening on `date`, and finishing by its close.
/// Booked meetings are not considered here.
pub fn is_candidate(
    window: &DailyWindow,
    event_type: &EventType,
    date: NaiveDate,
    start: NaiveDateTime,
) -> bool {
    let range = window.on(date);
    let offset = (start - range.start).num_minutes();
    start >= range.start
        && offset % i64::from(SLOT_STEP_MINUTES) == 0
        && start + event_type.duration() <= range.end
}

/// Render start times in the `HH:mm` wire format.
pub fn to_clock_times(slots: impl IntoIterator<Item = NaiveDateTime>) -> Vec<ClockTime> {
    slots.into_iter().map(ClockTime::of).collect()
}
