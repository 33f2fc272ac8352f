//! # slot-engine
//!
//! Bookable slot computation for a meeting scheduler.
//!
//! Given a host's weekly availability, an event type's duration and buffers,
//! and the meetings already booked, the engine lists the start times an
//! invitee may pick and re-validates a chosen start at commit time with the
//! same buffer-aware overlap rule, so no two meetings of one event type ever
//! overlap once buffers are applied.
//!
//! ## Modules
//!
//! - [`time`] - `HH:mm` clock times, daily windows, half-open ranges
//! - [`model`] - event types, availability, meetings, patches, booking requests
//! - [`availability`] - resolve the daily window that applies to a date
//! - [`slots`] - lazy slot enumeration on a fixed 15-minute grid
//! - [`conflict`] - the single buffer-aware conflict predicate
//! - [`store`] - persistence trait with an atomic commit contract
//! - [`memory`] - in-process store
//! - [`scheduler`] - listing, booking, cancellation and administration
//! - [`error`] - Error types

pub mod availability;
pub mod conflict;
pub mod error;
pub mod memory;
pub mod model;
pub mod scheduler;
pub mod slots;
pub mod store;
pub mod time;

pub use conflict::{find_conflicts, is_available};
pub use error::{ErrorKind, SlotError};
pub use memory::MemoryStore;
pub use model::{
    Availability, AvailabilityPatch, BookingRequest, EventType, EventTypeDraft, EventTypePatch,
    EventTypeSummary, HostId, Meeting, MeetingDetails, MeetingWindow, NewMeeting,
};
pub use scheduler::Scheduler;
pub use slots::{generate_slots, SLOT_STEP_MINUTES};
pub use store::SchedulingStore;
pub use time::{ClockTime, DailyWindow, TimeRange};
