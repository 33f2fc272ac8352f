//! Scheduling records: hosts, event types, weekly availability, meetings.
//!
//! Inputs that arrive from outside (drafts, patches, booking requests) carry
//! signed or optional fields and are validated into the stored types here, so
//! a zero duration or a negative buffer is rejected when the event type is
//! created, never while computing slots.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SlotError};
use crate::time::{ClockTime, DailyWindow, TimeRange};

/// Longest duration or buffer an event type may declare, one full day.
pub const MAX_MINUTES: i64 = 24 * 60;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("slug pattern is valid"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Identity of the host who owns event types, availability and meetings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(pub String);

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        HostId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostId {
    fn from(value: &str) -> Self {
        HostId(value.to_string())
    }
}

/// A bookable kind of meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub id: Uuid,
    pub host_id: HostId,
    pub name: String,
    pub slug: String,
    pub duration_minutes: u32,
    pub buffer_before: u32,
    pub buffer_after: u32,
}

impl EventType {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Buffer-expanded occupancy of a meeting of this type starting at `start`.
    pub fn occupancy(&self, start: NaiveDateTime) -> TimeRange {
        TimeRange::new(start, start + self.duration()).expand(self.buffer_before, self.buffer_after)
    }
}

/// Request body for creating an event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTypeDraft {
    pub name: String,
    pub slug: String,
    pub duration_minutes: i64,
    #[serde(default)]
    pub buffer_before: i64,
    #[serde(default)]
    pub buffer_after: i64,
}

impl EventTypeDraft {
    /// Validate the draft and mint a new event type owned by `host`.
    ///
    /// The slug is lowercased before it is checked against `[a-z0-9-]+`.
    ///
    /// # Errors
    /// Returns `SlotError::Validation` naming the first offending field.
    pub fn into_event_type(self, host: &HostId) -> Result<EventType> {
        let slug = self.slug.trim().to_lowercase();
        if !SLUG_RE.is_match(&slug) {
            return Err(SlotError::invalid(
                "slug",
                "must be lowercase alphanumeric with hyphens",
            ));
        }
        Ok(EventType {
            id: Uuid::new_v4(),
            host_id: host.clone(),
            name: validate_name("name", &self.name)?,
            slug,
            duration_minutes: validate_duration(self.duration_minutes)?,
            buffer_before: validate_buffer("buffer_before", self.buffer_before)?,
            buffer_after: validate_buffer("buffer_after", self.buffer_after)?,
        })
    }
}

/// Partial update of an event type. Absent fields keep their current value;
/// slug and owner cannot change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTypePatch {
    pub name: Option<String>,
    pub duration_minutes: Option<i64>,
    pub buffer_before: Option<i64>,
    pub buffer_after: Option<i64>,
}

impl EventTypePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.duration_minutes.is_none()
            && self.buffer_before.is_none()
            && self.buffer_after.is_none()
    }

    /// Merge this patch over `current`, validating every field it sets.
    pub fn apply(&self, current: &EventType) -> Result<EventType> {
        let mut next = current.clone();
        if let Some(name) = &self.name {
            next.name = validate_name("name", name)?;
        }
        if let Some(duration) = self.duration_minutes {
            next.duration_minutes = validate_duration(duration)?;
        }
        if let Some(before) = self.buffer_before {
            next.buffer_before = validate_buffer("buffer_before", before)?;
        }
        if let Some(after) = self.buffer_after {
            next.buffer_after = validate_buffer("buffer_after", after)?;
        }
        Ok(next)
    }
}

/// Weekly recurring hours for one (host, day-of-week).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub host_id: HostId,
    /// 0 = Sunday through 6 = Saturday.
    pub day_of_week: u8,
    #[serde(flatten)]
    pub window: DailyWindow,
}

impl Availability {
    /// # Errors
    /// Returns `SlotError::Validation` for a day outside `0..=6` or an empty window.
    pub fn new(host: &HostId, day_of_week: u8, start: ClockTime, end: ClockTime) -> Result<Self> {
        if day_of_week > 6 {
            return Err(SlotError::invalid(
                "day_of_week",
                format!("{} is outside 0 (Sunday) to 6 (Saturday)", day_of_week),
            ));
        }
        Ok(Availability {
            host_id: host.clone(),
            day_of_week,
            window: DailyWindow::new(start, end)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityPatch {
    pub start: Option<ClockTime>,
    pub end: Option<ClockTime>,
}

impl AvailabilityPatch {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn apply(&self, current: &Availability) -> Result<Availability> {
        let start = self.start.unwrap_or(current.window.start);
        let end = self.end.unwrap_or(current.window.end);
        Availability::new(&current.host_id, current.day_of_week, start, end)
    }
}

/// A booked meeting. Never mutated after commit; cancellation deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub host_id: HostId,
    pub event_type_id: Uuid,
    pub invitee_name: String,
    pub invitee_email: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub created_at: DateTime<Utc>,
}

impl Meeting {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

/// Which meetings a listing shows relative to "now".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingWindow {
    /// Starting at or after now.
    #[default]
    Upcoming,
    /// Started before now.
    Past,
    All,
}

impl MeetingWindow {
    pub fn contains(&self, meeting: &Meeting, now: NaiveDateTime) -> bool {
        match self {
            MeetingWindow::Upcoming => meeting.start >= now,
            MeetingWindow::Past => meeting.start < now,
            MeetingWindow::All => true,
        }
    }
}

/// The name and slug of the event type a meeting was booked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub duration_minutes: u32,
}

impl From<&EventType> for EventTypeSummary {
    fn from(event_type: &EventType) -> Self {
        EventTypeSummary {
            id: event_type.id,
            name: event_type.name.clone(),
            slug: event_type.slug.clone(),
            duration_minutes: event_type.duration_minutes,
        }
    }
}

/// A meeting together with its event type, as shown to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingDetails {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub event_type: EventTypeSummary,
}

/// A meeting about to be committed; the store assigns identity on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMeeting {
    pub host_id: HostId,
    pub event_type_id: Uuid,
    pub invitee_name: String,
    pub invitee_email: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl NewMeeting {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    pub fn into_meeting(self) -> Meeting {
        Meeting {
            id: Uuid::new_v4(),
            host_id: self.host_id,
            event_type_id: self.event_type_id,
            invitee_name: self.invitee_name,
            invitee_email: self.invitee_email,
            start: self.start,
            end: self.end,
            created_at: Utc::now(),
        }
    }
}

/// An invitee's booking submission: event type slug, who, and which slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub slug: String,
    pub invitee_name: String,
    pub invitee_email: String,
    pub date: NaiveDate,
    pub time: ClockTime,
}

impl BookingRequest {
    /// Check the invitee fields. Returns the trimmed name and email.
    pub fn validate_invitee(&self) -> Result<(String, String)> {
        let name = validate_name("invitee_name", &self.invitee_name)?;
        let email = self.invitee_email.trim();
        if !EMAIL_RE.is_match(email) {
            return Err(SlotError::invalid("invitee_email", "invalid email format"));
        }
        Ok((name, email.to_string()))
    }

    pub fn start(&self) -> NaiveDateTime {
        self.time.on(self.date)
    }
}

fn validate_name(field: &'static str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SlotError::invalid(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_duration(minutes: i64) -> Result<u32> {
    if minutes <= 0 {
        return Err(SlotError::invalid("duration_minutes", "must be positive"));
    }
    if minutes > MAX_MINUTES {
        return Err(SlotError::invalid(
            "duration_minutes",
            format!("must not exceed {} minutes", MAX_MINUTES),
        ));
    }
    Ok(minutes as u32)
}

fn validate_buffer(field: &'static str, minutes: i64) -> Result<u32> {
    if minutes < 0 {
        return Err(SlotError::invalid(field, "must not be negative"));
    }
    if minutes > MAX_MINUTES {
        return Err(SlotError::invalid(
            field,
            format!("must not exceed {} minutes", MAX_MINUTES),
        ));
    }
    Ok(minutes as u32)
}
