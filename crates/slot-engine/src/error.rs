//! Error types for slot-engine operations.

use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

/// Coarse classification of a [`SlotError`], used by outer layers to pick a
/// status code or exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Internal,
}

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Event type not found: {0}")]
    EventTypeNotFound(String),

    #[error("No availability for host '{host}' on day {day_of_week}")]
    AvailabilityNotFound { host: String, day_of_week: u8 },

    #[error("Meeting not found: {0}")]
    MeetingNotFound(Uuid),

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Slug already in use: {0}")]
    DuplicateSlug(String),

    #[error("Availability already exists for host '{host}' on day {day_of_week}")]
    DuplicateAvailability { host: String, day_of_week: u8 },

    #[error("Slot at {0} is no longer available")]
    Conflict(NaiveDateTime),

    #[error("Slot at {0} is not offered by this event type")]
    NotOffered(NaiveDateTime),

    #[error("Slot at {0} is in the past")]
    InPast(NaiveDateTime),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl SlotError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SlotError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SlotError::EventTypeNotFound(_)
            | SlotError::AvailabilityNotFound { .. }
            | SlotError::MeetingNotFound(_) => ErrorKind::NotFound,
            SlotError::Validation { .. }
            | SlotError::DuplicateAvailability { .. }
            | SlotError::InPast(_) => ErrorKind::Validation,
            SlotError::DuplicateSlug(_) | SlotError::Conflict(_) | SlotError::NotOffered(_) => {
                ErrorKind::Conflict
            }
            SlotError::Storage(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, SlotError>;
