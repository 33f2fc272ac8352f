//! In-process [`SchedulingStore`] behind a single mutex.
//!
//! Holding the lock across the conflict read and the insert serializes
//! commits, which is all the at-most-one-winner guarantee needs here.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::conflict;
use crate::error::{Result, SlotError};
use crate::model::{Availability, EventType, HostId, Meeting, NewMeeting};
use crate::store::{self, SchedulingStore};
use crate::time::TimeRange;

#[derive(Debug, Default)]
struct Tables {
    event_types: HashMap<Uuid, EventType>,
    availability: BTreeMap<(HostId, u8), Availability>,
    meetings: HashMap<Uuid, Meeting>,
}

impl Tables {
    fn meetings_in_range(&self, event_type_id: Uuid, range: TimeRange) -> Vec<Meeting> {
        let mut found: Vec<Meeting> = self
            .meetings
            .values()
            .filter(|m| m.event_type_id == event_type_id && m.range().overlaps(&range))
            .cloned()
            .collect();
        found.sort_by_key(|m| (m.start, m.end));
        found
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| SlotError::Storage("memory store lock poisoned".to_string()))
    }
}

impl SchedulingStore for MemoryStore {
    fn insert_event_type(&self, event_type: &EventType) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.event_types.values().any(|e| e.slug == event_type.slug) {
            return Err(SlotError::DuplicateSlug(event_type.slug.clone()));
        }
        tables.event_types.insert(event_type.id, event_type.clone());
        Ok(())
    }

    fn find_event_type(&self, id: Uuid) -> Result<Option<EventType>> {
        Ok(self.lock()?.event_types.get(&id).cloned())
    }

    fn find_event_type_by_slug(&self, slug: &str) -> Result<Option<EventType>> {
        Ok(self
            .lock()?
            .event_types
            .values()
            .find(|e| e.slug == slug)
            .cloned())
    }

    fn list_event_types(&self, host: &HostId) -> Result<Vec<EventType>> {
        let mut found: Vec<EventType> = self
            .lock()?
            .event_types
            .values()
            .filter(|e| &e.host_id == host)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    fn update_event_type(&self, event_type: &EventType) -> Result<()> {
        let mut tables = self.lock()?;
        match tables.event_types.get_mut(&event_type.id) {
            Some(stored) => {
                *stored = event_type.clone();
                Ok(())
            }
            None => Err(SlotError::EventTypeNotFound(event_type.slug.clone())),
        }
    }

    fn delete_event_type(&self, id: Uuid) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.event_types.remove(&id).is_none() {
            return Err(SlotError::EventTypeNotFound(id.to_string()));
        }
        tables.meetings.retain(|_, m| m.event_type_id != id);
        Ok(())
    }

    fn insert_availability(&self, availability: &Availability) -> Result<()> {
        let mut tables = self.lock()?;
        let key = (availability.host_id.clone(), availability.day_of_week);
        if tables.availability.contains_key(&key) {
            return Err(SlotError::DuplicateAvailability {
                host: availability.host_id.to_string(),
                day_of_week: availability.day_of_week,
            });
        }
        tables.availability.insert(key, availability.clone());
        Ok(())
    }

    fn find_availability(&self, host: &HostId, day_of_week: u8) -> Result<Option<Availability>> {
        Ok(self
            .lock()?
            .availability
            .get(&(host.clone(), day_of_week))
            .cloned())
    }

    fn list_availability(&self, host: &HostId) -> Result<Vec<Availability>> {
        Ok(self
            .lock()?
            .availability
            .values()
            .filter(|a| &a.host_id == host)
            .cloned()
            .collect())
    }

    fn update_availability(&self, availability: &Availability) -> Result<()> {
        let mut tables = self.lock()?;
        let key = (availability.host_id.clone(), availability.day_of_week);
        match tables.availability.get_mut(&key) {
            Some(stored) => {
                *stored = availability.clone();
                Ok(())
            }
            None => Err(SlotError::AvailabilityNotFound {
                host: availability.host_id.to_string(),
                day_of_week: availability.day_of_week,
            }),
        }
    }

    fn delete_availability(&self, host: &HostId, day_of_week: u8) -> Result<()> {
        let mut tables = self.lock()?;
        match tables.availability.remove(&(host.clone(), day_of_week)) {
            Some(_) => Ok(()),
            None => Err(SlotError::AvailabilityNotFound {
                host: host.to_string(),
                day_of_week,
            }),
        }
    }

    fn find_meetings_in_range(
        &self,
        event_type_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<Meeting>> {
        Ok(self.lock()?.meetings_in_range(event_type_id, range))
    }

    fn commit_meeting(&self, meeting: NewMeeting, event_type: &EventType) -> Result<Meeting> {
        let mut tables = self.lock()?;
        if !tables.event_types.contains_key(&event_type.id) {
            return Err(SlotError::EventTypeNotFound(event_type.slug.clone()));
        }
        let range = conflict::conflict_search_range(event_type, meeting.start, meeting.end);
        let existing = tables.meetings_in_range(event_type.id, range);
        store::check_commit(event_type, &meeting, &existing)?;

        let committed = meeting.into_meeting();
        tables.meetings.insert(committed.id, committed.clone());
        Ok(committed)
    }

    fn find_meeting(&self, id: Uuid) -> Result<Option<Meeting>> {
        Ok(self.lock()?.meetings.get(&id).cloned())
    }

    fn list_meetings(&self, host: &HostId) -> Result<Vec<Meeting>> {
        let mut found: Vec<Meeting> = self
            .lock()?
            .meetings
            .values()
            .filter(|m| &m.host_id == host)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.start.cmp(&a.start));
        Ok(found)
    }

    fn delete_meeting(&self, id: Uuid) -> Result<()> {
        match self.lock()?.meetings.remove(&id) {
            Some(_) => Ok(()),
            None => Err(SlotError::MeetingNotFound(id)),
        }
    }
}
