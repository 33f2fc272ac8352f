//! Tests for clock-time parsing, day-of-week resolution and range overlap.

use chrono::NaiveDate;
use slot_engine::time::{day_of_week, parse_date};
use slot_engine::{ClockTime, DailyWindow, TimeRange};

#[test]
fn clock_time_parses_zero_padded_24h() {
    let t: ClockTime = "09:05".parse().unwrap();
    assert_eq!(t.minutes_since_midnight(), 9 * 60 + 5);
    assert_eq!(t.to_string(), "09:05");

    let late: ClockTime = "23:59".parse().unwrap();
    assert_eq!(late.to_string(), "23:59");
}

#[test]
fn clock_time_rejects_malformed_input() {
    for bad in ["9:00", "09:0", "0900", "24:01", "25:00", "12:60", "ab:cd", "", "09:00:00", " 9:00"] {
        assert!(bad.parse::<ClockTime>().is_err(), "{:?} should be rejected", bad);
    }
}

#[test]
fn midnight_end_of_day_is_a_valid_window_end() {
    let end: ClockTime = "24:00".parse().unwrap();
    assert_eq!(end, ClockTime::END_OF_DAY);
    assert_eq!(end.minutes_since_midnight(), 24 * 60);
    assert_eq!(end.to_string(), "24:00");

    let day = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
    let evening = DailyWindow::new("18:00".parse().unwrap(), end).unwrap();
    let range = evening.on(day);
    assert_eq!(range.end, NaiveDate::from_ymd_opt(2026, 3, 17).unwrap().and_hms_opt(0, 0, 0).unwrap());
    assert_eq!(range.duration_minutes(), 6 * 60);

    assert!(DailyWindow::new(end, end).is_err());
}

#[test]
fn clock_time_of_truncates_to_the_minute() {
    let at = NaiveDate::from_ymd_opt(2026, 3, 16)
        .unwrap()
        .and_hms_opt(23, 59, 42)
        .unwrap();
    assert_eq!(ClockTime::of(at).to_string(), "23:59");
}

#[test]
fn clock_time_serializes_as_wire_string() {
    let t: ClockTime = "16:00".parse().unwrap();
    assert_eq!(serde_json::to_string(&t).unwrap(), "\"16:00\"");
    let back: ClockTime = serde_json::from_str("\"07:30\"").unwrap();
    assert_eq!(back.to_string(), "07:30");
    assert!(serde_json::from_str::<ClockTime>("\"7:30\"").is_err());
}

#[test]
fn day_of_week_counts_from_sunday() {
    let sunday = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
    let monday = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
    let saturday = NaiveDate::from_ymd_opt(2026, 3, 21).unwrap();
    assert_eq!(day_of_week(sunday), 0);
    assert_eq!(day_of_week(monday), 1);
    assert_eq!(day_of_week(saturday), 6);
}

#[test]
fn parse_date_is_strict() {
    assert_eq!(
        parse_date("2026-03-16").unwrap(),
        NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()
    );
    assert!(parse_date("2026-3-16").is_err());
    assert!(parse_date("2026-02-30").is_err());
    assert!(parse_date("16/03/2026").is_err());
}

#[test]
fn daily_window_requires_start_before_end() {
    let nine: ClockTime = "09:00".parse().unwrap();
    let five: ClockTime = "17:00".parse().unwrap();
    assert!(DailyWindow::new(nine, five).is_ok());
    assert!(DailyWindow::new(five, nine).is_err());
    assert!(DailyWindow::new(nine, nine).is_err());
}

#[test]
fn ranges_touching_at_an_endpoint_do_not_overlap() {
    let d = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
    let r = |h1, h2| {
        TimeRange::new(
            d.and_hms_opt(h1, 0, 0).unwrap(),
            d.and_hms_opt(h2, 0, 0).unwrap(),
        )
    };
    assert!(!r(9, 10).overlaps(&r(10, 11)));
    assert!(!r(10, 11).overlaps(&r(9, 10)));
    assert!(r(9, 11).overlaps(&r(10, 12)));
    assert!(r(9, 12).overlaps(&r(10, 11)));
    assert_eq!(r(10, 11).expand(15, 30).duration_minutes(), 105);
}
