//! Integration tests for the `slotbook` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to drive the actual binary
//! against a throwaway SQLite file, checking JSON on stdout and the exit code
//! for each class of failure.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use slot_engine::{NewMeeting, SchedulingStore};
use slot_engine_sqlite::SqliteStore;
use tempfile::TempDir;

/// Dates far enough ahead that the local clock never catches up with them.
const MONDAY: &str = "2099-03-16";
const SATURDAY: &str = "2099-03-21";
/// A Monday that is always behind the local clock.
const PAST_MONDAY: &str = "2001-01-01";

/// A scratch directory holding the database and an empty config file, so the
/// user's own `~/.config/slotbook` never leaks into a test.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "").unwrap();
        Workspace { dir }
    }

    fn seeded() -> Self {
        let ws = Self::new();
        ws.cmd().arg("seed").assert().success();
        ws
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("slotbook.db")
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("slotbook").unwrap();
        cmd.env_remove("RUST_LOG")
            .env_remove("SLOTBOOK_DB")
            .env_remove("SLOTBOOK_HOST")
            .arg("--config")
            .arg(self.config())
            .arg("--db")
            .arg(self.db());
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let out = self.cmd().args(args).assert().success().get_output().stdout.clone();
        serde_json::from_slice(&out).unwrap()
    }

    fn book(&self, time: &str) -> assert_cmd::assert::Assert {
        self.book_on(MONDAY, time)
    }

    fn book_on(&self, date: &str, time: &str) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "book",
                "--slug",
                "30min-consultation",
                "--date",
                date,
                "--time",
                time,
                "--name",
                "Jane Smith",
                "--email",
                "jane@example.com",
            ])
            .assert()
    }
}

fn strings(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Seed and slots
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn seed_then_list_slots() {
    let ws = Workspace::seeded();
    let slots = ws.json(&["slots", "--slug", "30min-consultation", "--date", MONDAY]);
    let slots = strings(&slots);
    assert_eq!(slots.first(), Some(&"09:00"));
    assert_eq!(slots.last(), Some(&"16:30"));
    assert!(slots.contains(&"09:15"));
}

#[test]
fn seed_is_repeatable() {
    let ws = Workspace::seeded();
    let second = ws.json(&["seed"]);
    assert_eq!(second["event_types_created"], 0);
    assert_eq!(second["availability_created"], 0);

    let types = ws.json(&["event-type", "list"]);
    assert_eq!(types.as_array().unwrap().len(), 2);
}

#[test]
fn slots_on_a_day_off_is_an_empty_array() {
    let ws = Workspace::seeded();
    let slots = ws.json(&["slots", "--slug", "1hour-meeting", "--date", SATURDAY]);
    assert_eq!(slots, Value::Array(vec![]));
}

#[test]
fn slots_on_a_past_date_is_an_empty_array() {
    let ws = Workspace::seeded();
    let slots = ws.json(&["slots", "--slug", "30min-consultation", "--date", PAST_MONDAY]);
    assert_eq!(slots, Value::Array(vec![]));
}

#[test]
fn slots_for_unknown_slug_exits_not_found() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args(["slots", "--slug", "nope", "--date", MONDAY])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Event type not found"));
}

#[test]
fn malformed_date_is_rejected() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args(["slots", "--slug", "30min-consultation", "--date", "16/03/2026"])
        .assert()
        .code(2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Booking and cancelling
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn book_prints_the_meeting() {
    let ws = Workspace::seeded();
    let out = ws.book("10:00").success().get_output().stdout.clone();
    let meeting: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(meeting["start"], "2099-03-16T10:00:00");
    assert_eq!(meeting["end"], "2099-03-16T10:30:00");
    assert_eq!(meeting["invitee_email"], "jane@example.com");
    assert_eq!(meeting["host_id"], "default");
}

#[test]
fn booking_inside_the_post_buffer_exits_conflict() {
    let ws = Workspace::seeded();
    ws.book("10:00").success();
    ws.book("10:30")
        .code(4)
        .stderr(predicate::str::contains("no longer available"));
    ws.book("10:45").success();

    let slots = ws.json(&["slots", "--slug", "30min-consultation", "--date", MONDAY]);
    let slots = strings(&slots);
    assert!(!slots.contains(&"10:00"));
    assert!(!slots.contains(&"10:30"));
}

#[test]
fn booking_off_the_grid_exits_conflict() {
    let ws = Workspace::seeded();
    ws.book("10:05").code(4);
    ws.book("16:45").code(4);
}

#[test]
fn booking_with_bad_email_exits_validation() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args([
            "book",
            "--slug",
            "30min-consultation",
            "--date",
            MONDAY,
            "--time",
            "10:00",
            "--name",
            "Jane",
            "--email",
            "not-an-email",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invitee_email"));
}

#[test]
fn booking_in_the_past_exits_validation() {
    let ws = Workspace::seeded();
    ws.book_on(PAST_MONDAY, "10:00")
        .code(2)
        .stderr(predicate::str::contains("in the past"));
    assert_eq!(ws.json(&["meetings", "--when", "all"]), Value::Array(vec![]));
}

#[test]
fn malformed_time_is_rejected() {
    let ws = Workspace::seeded();
    ws.book("9:00").code(2);
}

#[test]
fn cancel_frees_the_slot() {
    let ws = Workspace::seeded();
    let out = ws.book("11:00").success().get_output().stdout.clone();
    let meeting: Value = serde_json::from_slice(&out).unwrap();
    let id = meeting["id"].as_str().unwrap();

    let cancelled = ws.json(&["cancel", id]);
    assert_eq!(cancelled["id"], id);
    assert_eq!(ws.json(&["meetings"]), Value::Array(vec![]));
    ws.book("11:00").success();
}

#[test]
fn cancel_unknown_meeting_exits_not_found() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args(["cancel", "3f8a3c1e-9a6b-4d0e-8c43-2b1f0a9d7e55"])
        .assert()
        .code(3);
}

#[test]
fn meetings_of_another_host_are_invisible() {
    let ws = Workspace::seeded();
    ws.book("09:00").success();
    let other = ws.cmd().args(["--host", "someone-else", "meetings"]).assert().success();
    let listed: Value = serde_json::from_slice(&other.get_output().stdout).unwrap();
    assert_eq!(listed, Value::Array(vec![]));
}

#[test]
fn meetings_default_to_upcoming_and_embed_the_event_type() {
    let ws = Workspace::seeded();
    ws.book("10:00").success();

    let store = SqliteStore::open(ws.db()).unwrap();
    let event_type = store
        .find_event_type_by_slug("30min-consultation")
        .unwrap()
        .unwrap();
    let start = chrono::NaiveDate::from_ymd_opt(2001, 1, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    store
        .commit_meeting(
            NewMeeting {
                event_type_id: event_type.id,
                host_id: event_type.host_id.clone(),
                invitee_name: "Old Friend".to_string(),
                invitee_email: "old@example.com".to_string(),
                start,
                end: start + chrono::Duration::minutes(30),
            },
            &event_type,
        )
        .unwrap();
    drop(store);

    let upcoming = ws.json(&["meetings"]);
    let upcoming = upcoming.as_array().unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0]["start"], "2099-03-16T10:00:00");
    assert_eq!(upcoming[0]["event_type"]["slug"], "30min-consultation");
    assert_eq!(upcoming[0]["event_type"]["name"], "30 Minute Consultation");

    let past = ws.json(&["meetings", "--when", "past"]);
    let past = past.as_array().unwrap();
    assert_eq!(past.len(), 1);
    assert_eq!(past[0]["invitee_email"], "old@example.com");

    let all = ws.json(&["meetings", "--when", "all"]);
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["start"], "2099-03-16T10:00:00");

    ws.cmd().args(["meetings", "--when", "tomorrow"]).assert().code(2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Event types and availability
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn event_type_lifecycle() {
    let ws = Workspace::new();
    let created = ws.json(&[
        "event-type",
        "create",
        "--name",
        "Intro Call",
        "--slug",
        "Intro-Call",
        "--duration",
        "20",
        "--buffer-after",
        "10",
    ]);
    assert_eq!(created["slug"], "intro-call");
    assert_eq!(created["buffer_before"], 0);

    let updated = ws.json(&["event-type", "update", "intro-call", "--duration", "25"]);
    assert_eq!(updated["duration_minutes"], 25);
    assert_eq!(updated["buffer_after"], 10);

    ws.json(&["event-type", "delete", "intro-call"]);
    assert_eq!(ws.json(&["event-type", "list"]), Value::Array(vec![]));
}

#[test]
fn event_type_validation_and_duplicates() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args(["event-type", "create", "--name", "X", "--slug", "x", "--duration", "0"])
        .assert()
        .code(2);
    ws.cmd()
        .args(["event-type", "create", "--name", "X", "--slug", "bad slug", "--duration", "15"])
        .assert()
        .code(2);
    ws.cmd()
        .args([
            "event-type",
            "create",
            "--name",
            "Again",
            "--slug",
            "30min-consultation",
            "--duration",
            "30",
        ])
        .assert()
        .code(4);
    ws.cmd()
        .args(["event-type", "update", "30min-consultation"])
        .assert()
        .code(2);
}

#[test]
fn availability_lifecycle() {
    let ws = Workspace::new();
    let row = ws.json(&["availability", "set", "--day", "6", "--start", "10:00", "--end", "14:00"]);
    assert_eq!(row["day_of_week"], 6);
    assert_eq!(row["start"], "10:00");

    ws.cmd()
        .args(["availability", "set", "--day", "6", "--start", "08:00", "--end", "09:00"])
        .assert()
        .code(2);
    ws.cmd()
        .args(["availability", "set", "--day", "2", "--start", "12:00", "--end", "09:00"])
        .assert()
        .code(2);

    ws.cmd()
        .args(["availability", "update", "--day", "6"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--start, --end"));

    let updated = ws.json(&["availability", "update", "--day", "6", "--end", "12:00"]);
    assert_eq!(updated["start"], "10:00");
    assert_eq!(updated["end"], "12:00");

    ws.json(&["availability", "delete", "--day", "6"]);
    ws.cmd()
        .args(["availability", "delete", "--day", "6"])
        .assert()
        .code(3);
}

#[test]
fn availability_can_run_until_midnight() {
    let ws = Workspace::seeded();
    let row = ws.json(&["availability", "update", "--day", "1", "--end", "24:00"]);
    assert_eq!(row["end"], "24:00");

    let slots = ws.json(&["slots", "--slug", "1hour-meeting", "--date", MONDAY]);
    assert_eq!(strings(&slots).last(), Some(&"23:00"));
    ws.cmd()
        .args(["availability", "set", "--day", "0", "--start", "09:00", "--end", "24:01"])
        .assert()
        .code(2);
}

#[test]
fn audit_is_clean_after_normal_bookings() {
    let ws = Workspace::seeded();
    ws.book("09:00").success();
    ws.book("09:45").success();
    let conflicts = ws.json(&["audit", "--slug", "30min-consultation"]);
    assert_eq!(conflicts, Value::Array(vec![]));
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn config_file_supplies_database_and_host() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nested").join("from-config.db");
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "database = {:?}\nhost = \"alice\"\n\n[log]\nlevel = \"info\"\nformat = \"json\"\n",
            db.to_str().unwrap()
        ),
    )
    .unwrap();

    Command::cargo_bin("slotbook")
        .unwrap()
        .env_remove("RUST_LOG")
        .env_remove("SLOTBOOK_DB")
        .env_remove("SLOTBOOK_HOST")
        .arg("--config")
        .arg(&config)
        .arg("seed")
        .assert()
        .success();
    assert!(db.exists());

    let out = Command::cargo_bin("slotbook")
        .unwrap()
        .env_remove("RUST_LOG")
        .env_remove("SLOTBOOK_DB")
        .env_remove("SLOTBOOK_HOST")
        .arg("--config")
        .arg(&config)
        .args(["availability", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let rows: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 5);
    assert_eq!(rows[0]["host_id"], "alice");
}

#[test]
fn host_can_come_from_the_environment() {
    let ws = Workspace::seeded();
    let mut cmd = ws.cmd();
    cmd.env("SLOTBOOK_HOST", "bob").args(["event-type", "list"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let listed: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(listed, Value::Array(vec![]));
}

#[test]
fn missing_explicit_config_is_an_error() {
    Command::cargo_bin("slotbook")
        .unwrap()
        .args(["--config", "/definitely/not/here.toml", "meetings"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read config"));
}
