//! Integration tests for the report path: log file to aggregation to layout
//! to rendered output.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use dev_activity::aggregate::{aggregate_str, load_all};
use dev_activity::layout::{layout, DayCell, DayFill, Intensity};
use dev_activity::recorder::ActivityRecorder;
use dev_activity::render::{render_html, render_json, write_report};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn line(date: &str, project: &str) -> String {
    format!("{{\"date\":\"{date}\",\"ts\":\"{date}T12:00:00+00:00\",\"project\":\"{project}\"}}\n")
}

fn write_log(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn mixed_day_log() -> String {
    let mut log = String::new();
    for _ in 0..8 {
        log.push_str(&line("2024-01-05", "alpha"));
    }
    for _ in 0..2 {
        log.push_str(&line("2024-01-05", "beta"));
    }
    log
}

// =============================================================================
// Aggregation Tests
// =============================================================================

#[test]
fn test_missing_log_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let activity = load_all(&dir.path().join("nope.jsonl")).unwrap();
    assert!(activity.is_empty());
}

#[test]
fn test_load_all_is_idempotent_and_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "activity.jsonl", &mixed_day_log());

    let first = load_all(&path).unwrap();
    let second = load_all(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&path).unwrap(), mixed_day_log());
}

#[test]
fn test_malformed_lines_do_not_change_valid_counts() {
    let dir = tempfile::tempdir().unwrap();
    let clean = format!("{}{}", line("2024-01-05", "alpha"), line("2024-01-06", "beta"));
    let noisy = format!(
        "{}{{\"date\":\"2024-01-05\",\"proj\n{}not json at all\n{{\"date\":\"yesterday\",\"project\":\"x\"}}\n{{\"date\":\"2024-01-07\",\"project\":\"\"}}\n\n",
        line("2024-01-05", "alpha"),
        line("2024-01-06", "beta"),
    );

    let clean = load_all(&write_log(&dir, "clean.jsonl", &clean)).unwrap();
    let noisy = load_all(&write_log(&dir, "noisy.jsonl", &noisy)).unwrap();

    assert_eq!(clean, noisy);
    assert_eq!(noisy.total_records(), 2);
}

#[test]
fn test_non_utf8_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.jsonl");
    let mut bytes = line("2024-01-05", "alpha").into_bytes();
    bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
    bytes.extend_from_slice(line("2024-01-05", "alpha").as_bytes());
    fs::write(&path, bytes).unwrap();

    let activity = load_all(&path).unwrap();
    assert_eq!(activity.day(day("2024-01-05")).unwrap().count("alpha"), 2);
}

#[test]
fn test_concatenation_equals_merge() {
    let a = format!(
        "{}{}{}",
        line("2024-01-05", "alpha"),
        line("2024-01-05", "beta"),
        line("2024-01-06", "alpha")
    );
    let b = format!(
        "{}{}{}",
        line("2024-01-05", "beta"),
        line("2024-01-05", "gamma"),
        line("2024-02-01", "alpha")
    );

    let concatenated = aggregate_str(&format!("{a}{b}"));
    let mut merged = aggregate_str(&a);
    merged.merge(&aggregate_str(&b));

    assert_eq!(concatenated, merged);
    assert_eq!(merged.day(day("2024-01-05")).unwrap().count("beta"), 2);
}

#[test]
fn test_recorder_output_round_trips_through_aggregation() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = ActivityRecorder::new(dir.path().join("nested/activity.jsonl"));
    let ts = chrono::DateTime::parse_from_rfc3339("2024-01-05T14:03:11+01:00").unwrap();

    recorder.append("alpha", ts).unwrap();
    recorder.append("alpha", ts).unwrap();
    recorder.append("beta", ts).unwrap();

    let activity = load_all(recorder.path()).unwrap();
    let bucket = activity.day(day("2024-01-05")).unwrap();
    assert_eq!(bucket.count("alpha"), 2);
    assert_eq!(bucket.count("beta"), 1);
}

// =============================================================================
// Layout and Render Tests
// =============================================================================

#[test]
fn test_mixed_day_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "activity.jsonl", &mixed_day_log());

    let calendar = layout(&load_all(&path).unwrap(), day("2024-01-31"));

    let Some(DayCell::Active(cell)) = calendar.cell(day("2024-01-05")) else {
        panic!("expected an active cell");
    };
    assert_eq!(cell.intensity, Intensity::High);
    assert_eq!(cell.tooltip, "2024-01-05: alpha: 8, beta: 2");

    let DayFill::Banded { bands } = &cell.fill else {
        panic!("expected bands");
    };
    assert_eq!(bands[0].project, "alpha");
    assert!((bands[0].share() - 0.8).abs() < 1e-9);
    assert_eq!(bands[1].project, "beta");
    assert!((bands[1].share() - 0.2).abs() < 1e-9);
}

#[test]
fn test_empty_log_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let activity = load_all(&dir.path().join("activity.jsonl")).unwrap();

    let calendar = layout(&activity, day("2024-03-15"));

    let first = calendar.months.first().unwrap();
    let last = calendar.months.last().unwrap();
    assert_eq!((first.year, first.month), (2023, 3));
    assert_eq!((last.year, last.month), (2024, 3));
    assert!(calendar.legend.is_empty());
    assert!(calendar
        .months
        .iter()
        .flat_map(|m| m.days())
        .all(|c| matches!(c, DayCell::Empty { .. })));

    let html = render_html(&calendar);
    assert!(html.contains("Mar 2023"));
    assert!(html.contains("Mar 2024"));
    // The stylesheet always names the class; no swatch element is emitted
    assert!(!html.contains("class=\"legend-item\""));
}

#[test]
fn test_rendering_is_byte_identical() {
    let activity = aggregate_str(&mixed_day_log());
    let today = day("2024-03-15");

    assert_eq!(
        render_html(&layout(&activity, today)),
        render_html(&layout(&activity, today))
    );
    assert_eq!(
        render_json(&layout(&activity, today)).unwrap(),
        render_json(&layout(&activity, today)).unwrap()
    );
}

#[test]
fn test_write_report_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reports/activity-graph.html");
    let html = render_html(&layout(&aggregate_str(&mixed_day_log()), day("2024-01-31")));

    write_report(&out, &html).unwrap();

    let written = fs::read_to_string(Path::new(&out)).unwrap();
    assert!(written.starts_with("<!DOCTYPE html>"));
    assert!(written.contains("linear-gradient(to bottom"));
}
