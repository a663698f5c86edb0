use crate::metrics::{SegmentBounds, WindowPlan, DAY_MS, EXPECTED_INTERVAL_MS, HOUR_MS, MINUTE_MS};
use crate::slots::slot_of_ms;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The fixed set of uptime windows, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl WindowKind {
    pub const ALL: [WindowKind; 5] = [
        WindowKind::Hour,
        WindowKind::Day,
        WindowKind::Week,
        WindowKind::Month,
        WindowKind::Year,
    ];

    /// Key reported in window statistics
    pub fn key(&self) -> &'static str {
        match self {
            WindowKind::Hour => "1h",
            WindowKind::Day => "24h",
            WindowKind::Week => "7d",
            WindowKind::Month => "month",
            WindowKind::Year => "year",
        }
    }

    /// Segment width and count for rolling windows; None for calendar windows.
    pub fn interval(&self) -> Option<(i64, usize)> {
        match self {
            WindowKind::Hour => Some((5 * MINUTE_MS, 12)),
            WindowKind::Day => Some((HOUR_MS, 24)),
            WindowKind::Week => Some((DAY_MS, 7)),
            WindowKind::Month | WindowKind::Year => None,
        }
    }
}

/// Resolve the enabled windows against `now`, in the fixed display order.
pub fn build_windows<Tz>(now: DateTime<Utc>, enabled: &[WindowKind], tz: &Tz) -> Vec<WindowPlan>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    WindowKind::ALL
        .iter()
        .filter(|kind| enabled.contains(*kind))
        .map(|kind| build_window(*kind, now, tz))
        .collect()
}

pub fn build_window<Tz>(kind: WindowKind, now: DateTime<Utc>, tz: &Tz) -> WindowPlan
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local_now = now.with_timezone(tz);
    let (label, segments) = match kind {
        WindowKind::Hour => ("Past hour".to_string(), interval_segments(kind, now, tz)),
        WindowKind::Day => ("Past 24 hours".to_string(), interval_segments(kind, now, tz)),
        WindowKind::Week => ("Past 7 days".to_string(), interval_segments(kind, now, tz)),
        WindowKind::Month => (
            local_now.format("%B %Y").to_string(),
            month_segments(local_now.year(), local_now.month(), tz),
        ),
        WindowKind::Year => (
            local_now.format("%Y").to_string(),
            year_segments(local_now.year(), tz),
        ),
    };

    WindowPlan {
        key: kind.key().to_string(),
        label,
        segments,
    }
}

/// Fixed-width segments tiling backwards from the slot containing `now`;
/// the last segment ends on that slot.
fn interval_segments<Tz>(kind: WindowKind, now: DateTime<Utc>, tz: &Tz) -> Vec<SegmentBounds>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some((segment_ms, count)) = kind.interval() else {
        return Vec::new();
    };
    let segment_slots = (segment_ms / EXPECTED_INTERVAL_MS).max(1);
    let now_slot = slot_of_ms(now.timestamp_millis());
    let first_start = now_slot - count as i64 * segment_slots + 1;

    (0..count)
        .map(|index| {
            let start_slot = first_start + index as i64 * segment_slots;
            let end_slot = start_slot + segment_slots - 1;
            let start_ms = start_slot * EXPECTED_INTERVAL_MS;
            let end_ms = (end_slot + 1) * EXPECTED_INTERVAL_MS;
            SegmentBounds {
                key: format!("{}-{}", kind.key(), index),
                label: interval_label(kind, start_ms, end_ms, tz),
                start_slot,
                end_slot,
                start_ms,
                end_ms,
            }
        })
        .collect()
}

fn interval_label<Tz>(kind: WindowKind, start_ms: i64, end_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(start) = tz.timestamp_millis_opt(start_ms).single() else {
        return String::new();
    };
    let Some(end) = tz.timestamp_millis_opt(end_ms).single() else {
        return String::new();
    };
    match kind {
        WindowKind::Hour => end.format("%-I:%M %p").to_string(),
        WindowKind::Day => start.format("%-I %p").to_string(),
        WindowKind::Week => start.format("%a").to_string(),
        _ => start.format("%b %-d").to_string(),
    }
}

/// One segment per calendar day of the month, local midnight to midnight.
fn month_segments<Tz>(year: i32, month: u32, tz: &Tz) -> Vec<SegmentBounds>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };

    first
        .iter_days()
        .take_while(|day| day.month() == month)
        .filter_map(|day| {
            let next = day.succ_opt()?;
            Some(calendar_segment(
                format!("month-{}", day.day()),
                day.day().to_string(),
                local_midnight_ms(day, tz),
                local_midnight_ms(next, tz),
            ))
        })
        .collect()
}

/// One segment per calendar month of the year.
fn year_segments<Tz>(year: i32, tz: &Tz) -> Vec<SegmentBounds>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    (1..=12u32)
        .filter_map(|month| {
            let start = NaiveDate::from_ymd_opt(year, month, 1)?;
            let end = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)?
            };
            Some(calendar_segment(
                format!("year-{}", month - 1),
                start.format("%b").to_string(),
                local_midnight_ms(start, tz),
                local_midnight_ms(end, tz),
            ))
        })
        .collect()
}

fn calendar_segment(key: String, label: String, start_ms: i64, end_ms: i64) -> SegmentBounds {
    SegmentBounds {
        key,
        label,
        start_slot: slot_of_ms(start_ms),
        end_slot: slot_of_ms(end_ms - 1),
        start_ms,
        end_ms,
    }
}

/// Start of `date` in `tz`. Where midnight is skipped by a DST jump the day
/// starts at the first valid local time, found by stepping through the hour.
fn local_midnight_ms<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> i64 {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    (0..=60)
        .map(|minutes| midnight + chrono::Duration::minutes(minutes))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| midnight.and_utc().timestamp_millis())
}
