//! The scheduling service used by every outer surface.
//!
//! Listing and booking share one slot grid ([`SLOT_STEP_MINUTES`]) and one
//! conflict predicate, so a booking commits only if the listing would have
//! offered it at that moment. The service never retries: on
//! `SlotError::Conflict` the caller re-fetches slots and resubmits.
//!
//! The current time is an argument, like the host. Start times before `now`
//! are neither listed nor bookable.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::availability;
use crate::conflict::{self, Conflict};
use crate::error::{Result, SlotError};
use crate::model::{
    Availability, AvailabilityPatch, BookingRequest, EventType, EventTypeDraft, EventTypePatch,
    EventTypeSummary, HostId, Meeting, MeetingDetails, MeetingWindow, NewMeeting,
};
use crate::slots::{self, SLOT_STEP_MINUTES};
use crate::store::SchedulingStore;
use crate::time::{day_of_week, ClockTime, TimeRange};

pub struct Scheduler<S> {
    store: S,
}

impl<S: SchedulingStore> Scheduler<S> {
    pub fn new(store: S) -> Self {
        Scheduler { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open start times for the event type `slug` on `date`, as `HH:mm`.
    ///
    /// # Errors
    /// `SlotError::EventTypeNotFound` for an unknown slug. A day without
    /// availability, or a date already over at `now`, yields an empty list.
    pub fn slots(
        &self,
        host: &HostId,
        slug: &str,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<ClockTime>> {
        let event_type = self.event_type(host, slug)?;
        Ok(slots::to_clock_times(
            self.open_slots(host, &event_type, date, now)?,
        ))
    }

    /// Open start times for `event_type` on `date` as absolute timestamps,
    /// skipping any that begin before `now`.
    pub fn open_slots(
        &self,
        host: &HostId,
        event_type: &EventType,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>> {
        if date < now.date() {
            debug!(%date, %now, "date is in the past, no slots");
            return Ok(Vec::new());
        }
        let Some(window) = availability::resolve(&self.store, host, date)? else {
            debug!(%host, %date, "no availability, no slots");
            return Ok(Vec::new());
        };

        let day = window.on(date);
        let search = conflict::conflict_search_range(event_type, day.start, day.end);
        let booked = self.store.find_meetings_in_range(event_type.id, search)?;
        let open: Vec<NaiveDateTime> =
            slots::generate_slots(Some(&window), event_type, &booked, date)
                .filter(|start| *start >= now)
                .collect();

        debug!(
            event_type = %event_type.slug,
            %date,
            booked = booked.len(),
            open = open.len(),
            step_minutes = SLOT_STEP_MINUTES,
            "generated slots"
        );
        Ok(open)
    }

    /// Book a meeting for an invitee.
    ///
    /// # Errors
    /// - `SlotError::Validation` for a blank name or malformed email.
    /// - `SlotError::EventTypeNotFound` / `SlotError::AvailabilityNotFound`.
    /// - `SlotError::InPast` when the start is before `now`.
    /// - `SlotError::NotOffered` when the time is off the slot grid or outside
    ///   the window.
    /// - `SlotError::Conflict` when another meeting holds the interval.
    pub fn book(
        &self,
        host: &HostId,
        request: &BookingRequest,
        now: NaiveDateTime,
    ) -> Result<Meeting> {
        let (invitee_name, invitee_email) = request.validate_invitee()?;
        let event_type = self.event_type(host, &request.slug)?;

        let start = request.start();
        if start < now {
            return Err(SlotError::InPast(start));
        }

        let window = availability::resolve(&self.store, host, request.date)?.ok_or_else(|| {
            SlotError::AvailabilityNotFound {
                host: host.to_string(),
                day_of_week: day_of_week(request.date),
            }
        })?;

        if !slots::is_candidate(&window, &event_type, request.date, start) {
            return Err(SlotError::NotOffered(start));
        }

        let meeting = self.store.commit_meeting(
            NewMeeting {
                host_id: host.clone(),
                event_type_id: event_type.id,
                invitee_name,
                invitee_email,
                start,
                end: start + event_type.duration(),
            },
            &event_type,
        )?;

        info!(
            meeting = %meeting.id,
            event_type = %event_type.slug,
            start = %meeting.start,
            end = %meeting.end,
            "meeting booked"
        );
        Ok(meeting)
    }

    /// Cancel (delete) a meeting owned by `host`.
    pub fn cancel(&self, host: &HostId, meeting_id: Uuid) -> Result<Meeting> {
        let meeting = self
            .store
            .find_meeting(meeting_id)?
            .filter(|m| &m.host_id == host)
            .ok_or(SlotError::MeetingNotFound(meeting_id))?;
        self.store.delete_meeting(meeting_id)?;
        info!(meeting = %meeting_id, start = %meeting.start, "meeting cancelled");
        Ok(meeting)
    }

    /// Every meeting of `host`, most recent start first.
    pub fn meetings(&self, host: &HostId) -> Result<Vec<Meeting>> {
        self.store.list_meetings(host)
    }

    /// Meetings of `host` in `window` relative to `now`, most recent start
    /// first, each with the event type it was booked against.
    pub fn meeting_details(
        &self,
        host: &HostId,
        window: MeetingWindow,
        now: NaiveDateTime,
    ) -> Result<Vec<MeetingDetails>> {
        let event_types: HashMap<Uuid, EventTypeSummary> = self
            .store
            .list_event_types(host)?
            .iter()
            .map(|e| (e.id, EventTypeSummary::from(e)))
            .collect();

        let mut details = Vec::new();
        for meeting in self.store.list_meetings(host)? {
            if !window.contains(&meeting, now) {
                continue;
            }
            let event_type = match event_types.get(&meeting.event_type_id) {
                Some(summary) => summary.clone(),
                None => {
                    let id = meeting.event_type_id;
                    let found = self
                        .store
                        .find_event_type(id)?
                        .ok_or_else(|| SlotError::EventTypeNotFound(id.to_string()))?;
                    EventTypeSummary::from(&found)
                }
            };
            details.push(MeetingDetails {
                meeting,
                event_type,
            });
        }
        Ok(details)
    }

    /// Look up an event type owned by `host` by slug.
    pub fn event_type(&self, host: &HostId, slug: &str) -> Result<EventType> {
        self.store
            .find_event_type_by_slug(slug)?
            .filter(|e| &e.host_id == host)
            .ok_or_else(|| SlotError::EventTypeNotFound(slug.to_string()))
    }

    pub fn event_types(&self, host: &HostId) -> Result<Vec<EventType>> {
        self.store.list_event_types(host)
    }

    pub fn create_event_type(&self, host: &HostId, draft: EventTypeDraft) -> Result<EventType> {
        let event_type = draft.into_event_type(host)?;
        self.store.insert_event_type(&event_type)?;
        info!(slug = %event_type.slug, duration = event_type.duration_minutes, "event type created");
        Ok(event_type)
    }

    pub fn update_event_type(
        &self,
        host: &HostId,
        slug: &str,
        patch: &EventTypePatch,
    ) -> Result<EventType> {
        let current = self.event_type(host, slug)?;
        let next = patch.apply(&current)?;
        self.store.update_event_type(&next)?;
        Ok(next)
    }

    /// Delete an event type and every meeting booked against it.
    pub fn delete_event_type(&self, host: &HostId, slug: &str) -> Result<()> {
        let event_type = self.event_type(host, slug)?;
        self.store.delete_event_type(event_type.id)?;
        info!(slug, "event type deleted");
        Ok(())
    }

    pub fn availability(&self, host: &HostId) -> Result<Vec<Availability>> {
        self.store.list_availability(host)
    }

    pub fn set_availability(
        &self,
        host: &HostId,
        day_of_week: u8,
        start: ClockTime,
        end: ClockTime,
    ) -> Result<Availability> {
        let row = Availability::new(host, day_of_week, start, end)?;
        self.store.insert_availability(&row)?;
        Ok(row)
    }

    pub fn update_availability(
        &self,
        host: &HostId,
        day_of_week: u8,
        patch: &AvailabilityPatch,
    ) -> Result<Availability> {
        let current = self.store.find_availability(host, day_of_week)?.ok_or_else(|| {
            SlotError::AvailabilityNotFound {
                host: host.to_string(),
                day_of_week,
            }
        })?;
        let next = patch.apply(&current)?;
        self.store.update_availability(&next)?;
        Ok(next)
    }

    pub fn remove_availability(&self, host: &HostId, day_of_week: u8) -> Result<()> {
        self.store.delete_availability(host, day_of_week)
    }

    /// Pairs of stored meetings of `slug` that violate the buffer rule under
    /// the event type's current buffers.
    pub fn audit(&self, host: &HostId, slug: &str) -> Result<Vec<Conflict>> {
        let event_type = self.event_type(host, slug)?;
        let everything = TimeRange::new(NaiveDateTime::MIN, NaiveDateTime::MAX);
        let meetings = self.store.find_meetings_in_range(event_type.id, everything)?;
        Ok(conflict::find_conflicts(&event_type, &meetings))
    }
}
