//! The persistence seam: what the scheduling core reads and writes.
//!
//! Implementations must make [`SchedulingStore::commit_meeting`] atomic: the
//! read of potentially conflicting meetings and the insert of the new one may
//! not interleave with another commit, so at most one of two overlapping
//! bookings wins. Both bundled stores decide the conflict with
//! [`check_commit`], which is the same predicate slot listing uses.

use tracing::warn;
use uuid::Uuid;

use crate::conflict;
use crate::error::{Result, SlotError};
use crate::model::{Availability, EventType, HostId, Meeting, NewMeeting};
use crate::time::TimeRange;

pub trait SchedulingStore: Send + Sync {
    /// # Errors
    /// `SlotError::DuplicateSlug` when the slug is taken.
    fn insert_event_type(&self, event_type: &EventType) -> Result<()>;

    fn find_event_type(&self, id: Uuid) -> Result<Option<EventType>>;

    fn find_event_type_by_slug(&self, slug: &str) -> Result<Option<EventType>>;

    /// Event types owned by `host`, ordered by name.
    fn list_event_types(&self, host: &HostId) -> Result<Vec<EventType>>;

    /// Replace a stored event type, matched by id.
    fn update_event_type(&self, event_type: &EventType) -> Result<()>;

    /// Delete an event type together with its meetings.
    fn delete_event_type(&self, id: Uuid) -> Result<()>;

    /// # Errors
    /// `SlotError::DuplicateAvailability` when the (host, day) row exists.
    fn insert_availability(&self, availability: &Availability) -> Result<()>;

    fn find_availability(&self, host: &HostId, day_of_week: u8) -> Result<Option<Availability>>;

    /// Availability rows of `host`, ordered by day of week.
    fn list_availability(&self, host: &HostId) -> Result<Vec<Availability>>;

    fn update_availability(&self, availability: &Availability) -> Result<()>;

    fn delete_availability(&self, host: &HostId, day_of_week: u8) -> Result<()>;

    /// Meetings of `event_type_id` whose raw `[start, end)` overlaps `range`,
    /// ascending by start.
    fn find_meetings_in_range(&self, event_type_id: Uuid, range: TimeRange)
        -> Result<Vec<Meeting>>;

    /// Atomically re-check conflicts and insert the meeting.
    ///
    /// # Errors
    /// `SlotError::Conflict` when an existing meeting blocks the interval,
    /// `SlotError::EventTypeNotFound` when the event type vanished.
    fn commit_meeting(&self, meeting: NewMeeting, event_type: &EventType) -> Result<Meeting>;

    fn find_meeting(&self, id: Uuid) -> Result<Option<Meeting>>;

    /// Meetings of `host`, most recent start first.
    fn list_meetings(&self, host: &HostId) -> Result<Vec<Meeting>>;

    fn delete_meeting(&self, id: Uuid) -> Result<()>;
}

/// Decide a commit against the meetings read inside the store's critical section.
///
/// # Errors
/// `SlotError::Conflict` when any of `existing` blocks `meeting`.
pub fn check_commit(event_type: &EventType, meeting: &NewMeeting, existing: &[Meeting]) -> Result<()> {
    if let Some(blocking) = conflict::find_blocking(event_type, meeting.start, meeting.end, existing) {
        warn!(
            event_type = %event_type.slug,
            start = %meeting.start,
            blocking_meeting = %blocking.id,
            "booking rejected: interval conflicts with an existing meeting"
        );
        return Err(SlotError::Conflict(meeting.start));
    }
    Ok(())
}
