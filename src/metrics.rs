use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nominal cadence of the external connectivity check
pub const EXPECTED_INTERVAL_MS: i64 = 5 * 60 * 1000;
/// Jitter absorbed around the nominal cadence before a check counts as missed
pub const TOLERANCE_MS: i64 = 90 * 1000;
pub const MINUTE_MS: i64 = 60 * 1000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;
pub const MINUTES_PER_CHECK: i64 = EXPECTED_INTERVAL_MS / MINUTE_MS;

/// Shown wherever an uptime figure has no data behind it
pub const NO_DATA_PLACEHOLDER: &str = "–";

/// A single "Current IP is ..." line from the check log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub timestamp: DateTime<Utc>,
    pub ip: String,
}

impl CheckRecord {
    pub fn new(timestamp: DateTime<Utc>, ip: &str) -> Self {
        Self {
            timestamp,
            ip: ip.to_string(),
        }
    }
}

/// Events inferred between consecutive checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Gap {
    #[serde(rename_all = "camelCase")]
    Outage {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        missed_checks: u64,
        open: bool,
    },
    #[serde(rename = "ipchange", rename_all = "camelCase")]
    IpChange {
        timestamp: DateTime<Utc>,
        old_ip: String,
        new_ip: String,
    },
}

impl Gap {
    /// Point in time the gap is ordered by
    pub fn anchor(&self) -> DateTime<Utc> {
        match self {
            Gap::Outage { start, .. } => *start,
            Gap::IpChange { timestamp, .. } => *timestamp,
        }
    }

    pub fn missed_checks(&self) -> u64 {
        match self {
            Gap::Outage { missed_checks, .. } => *missed_checks,
            Gap::IpChange { .. } => 0,
        }
    }

    pub fn is_outage(&self) -> bool {
        matches!(self, Gap::Outage { .. })
    }
}

/// Display bucket of a window, before statistics are attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentBounds {
    pub key: String,
    pub label: String,
    pub start_slot: i64,
    pub end_slot: i64,
    pub start_ms: i64,
    pub end_ms: i64,
}

/// A window definition resolved against "now"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowPlan {
    pub key: String,
    pub label: String,
    pub segments: Vec<SegmentBounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStats {
    pub key: String,
    pub label: String,
    pub start_slot: i64,
    pub end_slot: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub available: u64,
    pub expected: u64,
    pub observed: u64,
    pub missed: u64,
    /// None when no check was expected in the segment
    pub uptime: Option<f64>,
    pub coverage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStats {
    pub key: String,
    pub label: String,
    pub segments: Vec<SegmentStats>,
    pub available: u64,
    pub observed: u64,
    pub expected: u64,
    pub missed: u64,
    pub uptime: Option<f64>,
    pub coverage: f64,
}

/// Full result of one analysis run over a log snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub records: Vec<CheckRecord>,
    pub gaps: Vec<Gap>,
    pub missed_checks: u64,
    pub expected_checks: u64,
    pub uptime_value: Option<f64>,
    pub uptime_text: String,
    pub first_record: Option<DateTime<Utc>>,
    pub last_record: Option<DateTime<Utc>>,
    pub window_stats: Vec<WindowStats>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn outage_count(&self) -> usize {
        self.gaps.iter().filter(|g| g.is_outage()).count()
    }
}
