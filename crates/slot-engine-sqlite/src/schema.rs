//! Table definitions and row conversions.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use slot_engine::{Availability, ClockTime, DailyWindow, EventType, HostId, Meeting};
use uuid::Uuid;

pub(crate) fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS event_types (
            id               TEXT PRIMARY KEY,
            host_id          TEXT NOT NULL,
            name             TEXT NOT NULL,
            slug             TEXT NOT NULL UNIQUE,
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
            buffer_before    INTEGER NOT NULL DEFAULT 0 CHECK (buffer_before >= 0),
            buffer_after     INTEGER NOT NULL DEFAULT 0 CHECK (buffer_after >= 0)
        );

        CREATE TABLE IF NOT EXISTS availability (
            host_id     TEXT NOT NULL,
            day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
            start_time  TEXT NOT NULL,
            end_time    TEXT NOT NULL,
            PRIMARY KEY (host_id, day_of_week)
        );

        -- start_at / end_at are seconds on the naive calendar, not UTC instants.
        CREATE TABLE IF NOT EXISTS meetings (
            id            TEXT PRIMARY KEY,
            host_id       TEXT NOT NULL,
            event_type_id TEXT NOT NULL REFERENCES event_types (id) ON DELETE CASCADE,
            invitee_name  TEXT NOT NULL,
            invitee_email TEXT NOT NULL,
            start_at      INTEGER NOT NULL,
            end_at        INTEGER NOT NULL,
            created_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_meetings_event_type_start ON meetings (event_type_id, start_at);
        CREATE INDEX IF NOT EXISTS idx_meetings_host_start ON meetings (host_id, start_at);",
    )
}

pub(crate) const EVENT_TYPE_COLUMNS: &str =
    "id, host_id, name, slug, duration_minutes, buffer_before, buffer_after";

pub(crate) const AVAILABILITY_COLUMNS: &str = "host_id, day_of_week, start_time, end_time";

pub(crate) const MEETING_COLUMNS: &str =
    "id, host_id, event_type_id, invitee_name, invitee_email, start_at, end_at, created_at";

pub(crate) fn to_epoch(at: NaiveDateTime) -> i64 {
    at.and_utc().timestamp()
}

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn uuid_at(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn clock_at(row: &Row, idx: usize) -> rusqlite::Result<ClockTime> {
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, Type::Text, e))
}

fn naive_at(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

fn utc_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

pub(crate) fn row_to_event_type(row: &Row) -> rusqlite::Result<EventType> {
    Ok(EventType {
        id: uuid_at(row, 0)?,
        host_id: HostId(row.get(1)?),
        name: row.get(2)?,
        slug: row.get(3)?,
        duration_minutes: row.get(4)?,
        buffer_before: row.get(5)?,
        buffer_after: row.get(6)?,
    })
}

pub(crate) fn row_to_availability(row: &Row) -> rusqlite::Result<Availability> {
    let start = clock_at(row, 2)?;
    let end = clock_at(row, 3)?;
    Ok(Availability {
        host_id: HostId(row.get(0)?),
        day_of_week: row.get(1)?,
        window: DailyWindow::new(start, end).map_err(|e| conversion_error(2, Type::Text, e))?,
    })
}

pub(crate) fn row_to_meeting(row: &Row) -> rusqlite::Result<Meeting> {
    Ok(Meeting {
        id: uuid_at(row, 0)?,
        host_id: HostId(row.get(1)?),
        event_type_id: uuid_at(row, 2)?,
        invitee_name: row.get(3)?,
        invitee_email: row.get(4)?,
        start: naive_at(row, 5)?,
        end: naive_at(row, 6)?,
        created_at: utc_at(row, 7)?,
    })
}
