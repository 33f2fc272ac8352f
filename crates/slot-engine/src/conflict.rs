//! Buffer-aware conflict detection between a candidate booking and existing meetings.
//!
//! Every meeting occupies `[start - buffer_before, end + buffer_after)` of its
//! event type. A candidate conflicts with a meeting when those buffer-expanded
//! ranges overlap under half-open comparison, so a meeting whose buffer ends
//! exactly where the next one's buffer begins is NOT a conflict.
//!
//! Slot listing and booking commit both go through [`is_available`].

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::model::{EventType, Meeting};
use crate::time::TimeRange;

/// Two meetings of one event type whose buffer-expanded ranges overlap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub meeting_a: Meeting,
    pub meeting_b: Meeting,
    pub overlap_minutes: i64,
}

/// Buffer-expanded occupancy of an existing meeting under `event_type`'s buffers.
pub fn meeting_occupancy(event_type: &EventType, meeting: &Meeting) -> TimeRange {
    meeting
        .range()
        .expand(event_type.buffer_before, event_type.buffer_after)
}

/// The first meeting of `event_type` that blocks a booking of `[start, end)`.
///
/// Meetings belonging to other event types are ignored.
pub fn find_blocking<'a>(
    event_type: &EventType,
    start: NaiveDateTime,
    end: NaiveDateTime,
    existing: &'a [Meeting],
) -> Option<&'a Meeting> {
    let candidate =
        TimeRange::new(start, end).expand(event_type.buffer_before, event_type.buffer_after);
    existing
        .iter()
        .filter(|m| m.event_type_id == event_type.id)
        .find(|m| candidate.overlaps(&meeting_occupancy(event_type, m)))
}

/// Whether `[start, end)` can be booked for `event_type` given `existing` meetings.
pub fn is_available(
    event_type: &EventType,
    start: NaiveDateTime,
    end: NaiveDateTime,
    existing: &[Meeting],
) -> bool {
    find_blocking(event_type, start, end, existing).is_none()
}

/// The range of meeting times that could possibly conflict with `[start, end)`.
///
/// Both sides are padded by both buffers, so any meeting overlapping this range
/// is a candidate for [`is_available`] and any meeting outside it never is.
/// Stores use it to bound the meetings they read at commit time.
pub fn conflict_search_range(
    event_type: &EventType,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> TimeRange {
    let pad = event_type.buffer_before + event_type.buffer_after;
    TimeRange::new(start, end).expand(pad, pad)
}

/// Find all pairs of `event_type` meetings whose buffer-expanded ranges overlap.
///
/// With the commit path enforcing [`is_available`] this is always empty; it
/// exists to audit stored data, e.g. after buffers were widened by a patch.
pub fn find_conflicts(event_type: &EventType, meetings: &[Meeting]) -> Vec<Conflict> {
    let own: Vec<&Meeting> = meetings
        .iter()
        .filter(|m| m.event_type_id == event_type.id)
        .collect();

    let mut conflicts = Vec::new();
    for (i, a) in own.iter().enumerate() {
        let a_range = meeting_occupancy(event_type, a);
        for b in &own[i + 1..] {
            let b_range = meeting_occupancy(event_type, b);
            if a_range.overlaps(&b_range) {
                let overlap_start = a_range.start.max(b_range.start);
                let overlap_end = a_range.end.min(b_range.end);
                conflicts.push(Conflict {
                    meeting_a: (*a).clone(),
                    meeting_b: (*b).clone(),
                    overlap_minutes: (overlap_end - overlap_start).num_minutes(),
                });
            }
        }
    }

    conflicts
}
