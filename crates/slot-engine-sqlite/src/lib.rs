//! # slot-engine-sqlite
//!
//! A [`SchedulingStore`] on SQLite.
//!
//! Booking commits run inside a `BEGIN IMMEDIATE` transaction: the write lock
//! is taken before the conflicting meetings are read, so two processes (or two
//! connections in one process) booking overlapping intervals are serialized
//! and the second one sees the first one's row. Waiting writers block for up to
//! [`BUSY_TIMEOUT`] before the commit fails with a storage error.

mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use slot_engine::conflict::conflict_search_range;
use slot_engine::error::{Result, SlotError};
use slot_engine::store::{check_commit, SchedulingStore};
use slot_engine::{Availability, EventType, HostId, Meeting, NewMeeting, TimeRange};
use tracing::debug;
use uuid::Uuid;

use schema::{
    row_to_availability, row_to_event_type, row_to_meeting, to_epoch, AVAILABILITY_COLUMNS,
    EVENT_TYPE_COLUMNS, MEETING_COLUMNS,
};

/// How long a connection waits for another writer before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

trait StorageResultExt<T> {
    fn storage(self) -> Result<T>;
}

impl<T> StorageResultExt<T> for rusqlite::Result<T> {
    fn storage(self) -> Result<T> {
        self.map_err(|e| SlotError::Storage(e.to_string()))
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening sqlite store");
        Self::from_connection(Connection::open(path).storage()?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory().storage()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT).storage()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;").storage()?;
        schema::migrate(&conn).storage()?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SlotError::Storage("sqlite connection lock poisoned".to_string()))
    }
}

fn meetings_in_range(
    conn: &Connection,
    event_type_id: Uuid,
    range: TimeRange,
) -> rusqlite::Result<Vec<Meeting>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEETING_COLUMNS} FROM meetings
         WHERE event_type_id = ?1 AND start_at < ?2 AND end_at > ?3
         ORDER BY start_at, end_at"
    ))?;
    let rows = stmt.query_map(
        params![
            event_type_id.to_string(),
            to_epoch(range.end),
            to_epoch(range.start)
        ],
        row_to_meeting,
    )?;
    rows.collect()
}

impl SchedulingStore for SqliteStore {
    fn insert_event_type(&self, event_type: &EventType) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO event_types (id, host_id, name, slug, duration_minutes, buffer_before, buffer_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event_type.id.to_string(),
                event_type.host_id.as_str(),
                event_type.name,
                event_type.slug,
                event_type.duration_minutes,
                event_type.buffer_before,
                event_type.buffer_after,
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                SlotError::DuplicateSlug(event_type.slug.clone())
            } else {
                SlotError::Storage(e.to_string())
            }
        })?;
        Ok(())
    }

    fn find_event_type(&self, id: Uuid) -> Result<Option<EventType>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {EVENT_TYPE_COLUMNS} FROM event_types WHERE id = ?1"),
            params![id.to_string()],
            row_to_event_type,
        )
        .optional()
        .storage()
    }

    fn find_event_type_by_slug(&self, slug: &str) -> Result<Option<EventType>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {EVENT_TYPE_COLUMNS} FROM event_types WHERE slug = ?1"),
            params![slug],
            row_to_event_type,
        )
        .optional()
        .storage()
    }

    fn list_event_types(&self, host: &HostId) -> Result<Vec<EventType>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EVENT_TYPE_COLUMNS} FROM event_types WHERE host_id = ?1 ORDER BY name"
            ))
            .storage()?;
        let rows = stmt
            .query_map(params![host.as_str()], row_to_event_type)
            .storage()?;
        rows.collect::<rusqlite::Result<Vec<_>>>().storage()
    }

    fn update_event_type(&self, event_type: &EventType) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE event_types
                 SET name = ?2, duration_minutes = ?3, buffer_before = ?4, buffer_after = ?5
                 WHERE id = ?1",
                params![
                    event_type.id.to_string(),
                    event_type.name,
                    event_type.duration_minutes,
                    event_type.buffer_before,
                    event_type.buffer_after,
                ],
            )
            .storage()?;
        if changed == 0 {
            return Err(SlotError::EventTypeNotFound(event_type.slug.clone()));
        }
        Ok(())
    }

    fn delete_event_type(&self, id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute("DELETE FROM event_types WHERE id = ?1", params![id.to_string()])
            .storage()?;
        if changed == 0 {
            return Err(SlotError::EventTypeNotFound(id.to_string()));
        }
        Ok(())
    }

    fn insert_availability(&self, availability: &Availability) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO availability (host_id, day_of_week, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                availability.host_id.as_str(),
                availability.day_of_week,
                availability.window.start.to_string(),
                availability.window.end.to_string(),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                SlotError::DuplicateAvailability {
                    host: availability.host_id.to_string(),
                    day_of_week: availability.day_of_week,
                }
            } else {
                SlotError::Storage(e.to_string())
            }
        })?;
        Ok(())
    }

    fn find_availability(&self, host: &HostId, day_of_week: u8) -> Result<Option<Availability>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {AVAILABILITY_COLUMNS} FROM availability
                 WHERE host_id = ?1 AND day_of_week = ?2"
            ),
            params![host.as_str(), day_of_week],
            row_to_availability,
        )
        .optional()
        .storage()
    }

    fn list_availability(&self, host: &HostId) -> Result<Vec<Availability>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {AVAILABILITY_COLUMNS} FROM availability
                 WHERE host_id = ?1 ORDER BY day_of_week"
            ))
            .storage()?;
        let rows = stmt
            .query_map(params![host.as_str()], row_to_availability)
            .storage()?;
        rows.collect::<rusqlite::Result<Vec<_>>>().storage()
    }

    fn update_availability(&self, availability: &Availability) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE availability SET start_time = ?3, end_time = ?4
                 WHERE host_id = ?1 AND day_of_week = ?2",
                params![
                    availability.host_id.as_str(),
                    availability.day_of_week,
                    availability.window.start.to_string(),
                    availability.window.end.to_string(),
                ],
            )
            .storage()?;
        if changed == 0 {
            return Err(SlotError::AvailabilityNotFound {
                host: availability.host_id.to_string(),
                day_of_week: availability.day_of_week,
            });
        }
        Ok(())
    }

    fn delete_availability(&self, host: &HostId, day_of_week: u8) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "DELETE FROM availability WHERE host_id = ?1 AND day_of_week = ?2",
                params![host.as_str(), day_of_week],
            )
            .storage()?;
        if changed == 0 {
            return Err(SlotError::AvailabilityNotFound {
                host: host.to_string(),
                day_of_week,
            });
        }
        Ok(())
    }

    fn find_meetings_in_range(
        &self,
        event_type_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<Meeting>> {
        let conn = self.lock()?;
        meetings_in_range(&conn, event_type_id, range).storage()
    }

    fn commit_meeting(&self, meeting: NewMeeting, event_type: &EventType) -> Result<Meeting> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .storage()?;

        let still_exists: Option<String> = tx
            .query_row(
                "SELECT id FROM event_types WHERE id = ?1",
                params![event_type.id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .storage()?;
        if still_exists.is_none() {
            return Err(SlotError::EventTypeNotFound(event_type.slug.clone()));
        }

        let range = conflict_search_range(event_type, meeting.start, meeting.end);
        let existing = meetings_in_range(&tx, event_type.id, range).storage()?;
        check_commit(event_type, &meeting, &existing)?;

        let committed = meeting.into_meeting();
        tx.execute(
            "INSERT INTO meetings (id, host_id, event_type_id, invitee_name, invitee_email, start_at, end_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                committed.id.to_string(),
                committed.host_id.as_str(),
                committed.event_type_id.to_string(),
                committed.invitee_name,
                committed.invitee_email,
                to_epoch(committed.start),
                to_epoch(committed.end),
                committed.created_at.to_rfc3339(),
            ],
        )
        .storage()?;
        tx.commit().storage()?;
        Ok(committed)
    }

    fn find_meeting(&self, id: Uuid) -> Result<Option<Meeting>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1"),
            params![id.to_string()],
            row_to_meeting,
        )
        .optional()
        .storage()
    }

    fn list_meetings(&self, host: &HostId) -> Result<Vec<Meeting>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MEETING_COLUMNS} FROM meetings WHERE host_id = ?1 ORDER BY start_at DESC"
            ))
            .storage()?;
        let rows = stmt.query_map(params![host.as_str()], row_to_meeting).storage()?;
        rows.collect::<rusqlite::Result<Vec<_>>>().storage()
    }

    fn delete_meeting(&self, id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute("DELETE FROM meetings WHERE id = ?1", params![id.to_string()])
            .storage()?;
        if changed == 0 {
            return Err(SlotError::MeetingNotFound(id));
        }
        Ok(())
    }
}
