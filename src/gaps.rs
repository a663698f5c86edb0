use crate::metrics::{CheckRecord, Gap, EXPECTED_INTERVAL_MS, MINUTES_PER_CHECK, TOLERANCE_MS};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Outages and IP changes inferred from a record sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GapReport {
    pub gaps: Vec<Gap>,
    pub missed_checks: u64,
}

/// Checks missed over `diff_ms` of elapsed time, after jitter tolerance.
pub fn missing_checks(diff_ms: i64) -> u64 {
    let missing = (diff_ms - TOLERANCE_MS).div_euclid(EXPECTED_INTERVAL_MS);
    missing.max(0) as u64
}

/// Walk ascending records and infer outages, IP changes, and the trailing
/// open outage if the last check is stale relative to `now`.
pub fn detect_gaps(records: &[CheckRecord], now: DateTime<Utc>) -> GapReport {
    let mut report = GapReport::default();
    let interval = Duration::milliseconds(EXPECTED_INTERVAL_MS);

    for pair in records.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let diff = (next.timestamp - current.timestamp).num_milliseconds();

        let missing = missing_checks(diff);
        if missing > 0 {
            report.missed_checks += missing;
            report.gaps.push(Gap::Outage {
                start: current.timestamp + interval,
                end: next.timestamp,
                missed_checks: missing,
                open: false,
            });
        }

        if current.ip != next.ip {
            report.gaps.push(Gap::IpChange {
                timestamp: next.timestamp,
                old_ip: current.ip.clone(),
                new_ip: next.ip.clone(),
            });
        }
    }

    if let Some(last) = records.last() {
        let missing = missing_checks((now - last.timestamp).num_milliseconds());
        if missing > 0 {
            report.missed_checks += missing;
            report.gaps.push(Gap::Outage {
                start: last.timestamp + interval,
                end: now,
                missed_checks: missing,
                open: true,
            });
        }
    }

    report.gaps.sort_by_key(Gap::anchor);
    report
}

/// Noise filter and truncation applied to the gap list for display.
/// Aggregate uptime is computed before filtering and is unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapFilter {
    pub min_missed_checks: u64,
    pub max_visible: usize,
}

impl Default for GapFilter {
    fn default() -> Self {
        Self {
            min_missed_checks: 0,
            max_visible: 3,
        }
    }
}

impl GapFilter {
    pub fn new(min_outage_minutes: f64, max_visible: usize) -> Self {
        Self {
            min_missed_checks: checks_for_minutes(min_outage_minutes),
            max_visible: max_visible.max(1),
        }
    }

    /// Most recent first, truncated to `max_visible` unless `expanded`.
    pub fn apply<'a>(&self, gaps: &'a [Gap], expanded: bool) -> GapListing<'a> {
        let mut matching: Vec<&Gap> = gaps
            .iter()
            .filter(|gap| !gap.is_outage() || gap.missed_checks() >= self.min_missed_checks)
            .collect();
        matching.reverse();

        let total = matching.len();
        let remaining = total.saturating_sub(self.max_visible);
        if !expanded {
            matching.truncate(self.max_visible);
        }

        GapListing {
            gaps: matching,
            total,
            remaining,
        }
    }
}

/// Minutes of outage converted to a whole number of checks, rounded up.
pub fn checks_for_minutes(minutes: f64) -> u64 {
    if !minutes.is_finite() || minutes <= 0.0 {
        return 0;
    }
    (minutes / MINUTES_PER_CHECK as f64).ceil() as u64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapListing<'a> {
    pub gaps: Vec<&'a Gap>,
    /// Entries passing the filter, shown or not
    pub total: usize,
    /// Entries beyond `max_visible`
    pub remaining: usize,
}
