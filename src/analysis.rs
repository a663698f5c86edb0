use crate::config::NetworkSettings;
use crate::gaps::{detect_gaps, GapFilter};
use crate::metrics::*;
use crate::parser::parse_log;
use crate::slots::{slot_of, SlotIndex};
use crate::stats::{compute_window_stats, percent, SlotContext};
use crate::windows::{build_windows, WindowKind};
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;
use tracing::debug;

/// Stateless analyzer over complete log snapshots.
///
/// Every call recomputes from scratch, so one analyzer can be shared
/// freely between concurrent requests.
#[derive(Debug, Clone)]
pub struct Analyzer<Tz: TimeZone> {
    tz: Tz,
    windows: Vec<WindowKind>,
}

impl<Tz> Analyzer<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn new(tz: Tz, windows: Vec<WindowKind>) -> Self {
        let windows = if windows.is_empty() {
            WindowKind::ALL.to_vec()
        } else {
            windows
        };
        Self { tz, windows }
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    pub fn windows(&self) -> &[WindowKind] {
        &self.windows
    }

    pub fn analyze_text(&self, text: &str, now: DateTime<Utc>) -> AnalysisResult {
        self.analyze(parse_log(text, &self.tz), now)
    }

    /// Analyze records already in ascending timestamp order.
    pub fn analyze(&self, records: Vec<CheckRecord>, now: DateTime<Utc>) -> AnalysisResult {
        let plans = build_windows(now, &self.windows, &self.tz);
        let slots = SlotIndex::from_records(&records);
        let ctx = SlotContext {
            now_slot: slot_of(now),
            first_slot: slots.first(),
        };
        let window_stats = compute_window_stats(&plans, &slots, ctx);

        if slots.is_empty() {
            debug!("No check records to analyze");
            return AnalysisResult {
                records,
                gaps: Vec::new(),
                missed_checks: 0,
                expected_checks: 0,
                uptime_value: None,
                uptime_text: NO_DATA_PLACEHOLDER.to_string(),
                first_record: None,
                last_record: None,
                window_stats,
            };
        }

        let report = detect_gaps(&records, now);
        let expected_checks = records.len() as u64 + report.missed_checks;
        let uptime_value = percent(records.len() as u64, expected_checks);
        let uptime_text = format_overall_uptime(uptime_value, report.missed_checks);

        debug!(
            records = records.len(),
            distinct_slots = slots.len(),
            gaps = report.gaps.len(),
            missed = report.missed_checks,
            uptime = %uptime_text,
            "Analyzed check log"
        );

        AnalysisResult {
            first_record: records.first().map(|r| r.timestamp),
            last_record: records.last().map(|r| r.timestamp),
            records,
            gaps: report.gaps,
            missed_checks: report.missed_checks,
            expected_checks,
            uptime_value,
            uptime_text,
            window_stats,
        }
    }
}

/// Uptime as shown to people: placeholder for no data, clamped, two decimals.
pub fn format_percent(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return NO_DATA_PLACEHOLDER.to_string();
    };
    let clamped = value.clamp(0.0, 100.0);
    if clamped >= 99.995 {
        "100%".to_string()
    } else {
        format!("{:.2}%", clamped)
    }
}

/// Aggregate uptime text: "100%" only when no check was missed, otherwise
/// capped at "99.99%".
pub fn format_overall_uptime(value: Option<f64>, missed_checks: u64) -> String {
    match value.filter(|v| v.is_finite()) {
        None => NO_DATA_PLACEHOLDER.to_string(),
        Some(_) if missed_checks == 0 => "100%".to_string(),
        Some(v) => format!("{:.2}%", v.clamp(0.0, 99.99)),
    }
}

pub fn format_duration(ms: i64) -> String {
    let minutes = (ms.max(0) as f64 / MINUTE_MS as f64).round() as i64;
    if minutes < 1 {
        return "<1 min".to_string();
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{} hr{}", hours, if hours == 1 { "" } else { "s" }));
    }
    if remaining > 0 {
        parts.push(format!("{} min", remaining));
    }
    parts.join(" ")
}

/// Single-character pill for a segment, as drawn in the uptime strip
fn segment_glyph(segment: &SegmentStats) -> char {
    if segment.available == 0 {
        return ' ';
    }
    match segment.uptime {
        None => '.',
        Some(u) if u >= 99.0 => '#',
        Some(u) if u >= 95.0 => '+',
        Some(_) => '!',
    }
}

pub fn generate_report<Tz>(
    analysis: &AnalysisResult,
    settings: &NetworkSettings,
    tz: &Tz,
    expand_gaps: bool,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stamp = |at: DateTime<Utc>| at.with_timezone(tz).format("%b %-d, %Y %-I:%M:%S %p").to_string();
    let mut report = String::new();

    // Header
    report.push_str("═══════════════════════════════════════════════════════════════════\n");
    report.push_str("                    Network Availability Report                     \n");
    report.push_str("═══════════════════════════════════════════════════════════════════\n\n");

    if settings.metrics.show {
        report.push_str("───────────────────────────────────────────────────────────────────\n");
        report.push_str("                             SUMMARY                                \n");
        report.push_str("───────────────────────────────────────────────────────────────────\n\n");

        if analysis.is_empty() {
            report.push_str("  No log entries found.\n\n");
        } else {
            report.push_str(&format!("  Uptime:            {:>10}\n", analysis.uptime_text));
            report.push_str(&format!("  Checks Logged:     {:>10}\n", analysis.records.len()));
            report.push_str(&format!("  Checks Expected:   {:>10}\n", analysis.expected_checks));
            report.push_str(&format!("  Checks Missed:     {:>10}\n", analysis.missed_checks));
            if let (Some(first), Some(last)) = (analysis.first_record, analysis.last_record) {
                report.push_str(&format!("  First Check:       {}\n", stamp(first)));
                report.push_str(&format!("  Last Check:        {}\n", stamp(last)));
            }
            report.push('\n');
        }
    }

    if settings.uptime.show {
        report.push_str("───────────────────────────────────────────────────────────────────\n");
        report.push_str("                          UPTIME WINDOWS                            \n");
        report.push_str("───────────────────────────────────────────────────────────────────\n\n");

        if analysis.window_stats.is_empty() {
            report.push_str("  No log data available yet.\n\n");
        }

        for window in &analysis.window_stats {
            let strip: String = window.segments.iter().map(segment_glyph).collect();
            report.push_str(&format!(
                "  {:<16} [{}] {:>8}\n",
                window.label,
                strip,
                format_percent(window.uptime)
            ));

            if window.expected == 0 {
                report.push_str("                   No data collected for this window yet.\n");
                continue;
            }

            let mut meta = vec![format!("{} of {} checks", window.observed, window.expected)];
            if window.missed > 0 {
                meta.push(format!(
                    "{} missed ({})",
                    window.missed,
                    format_duration(window.missed as i64 * EXPECTED_INTERVAL_MS)
                ));
            } else {
                meta.push("No missed checks".to_string());
            }
            if window.coverage < 0.98 {
                meta.push(format!("{}% coverage", (window.coverage * 100.0).round()));
            }
            report.push_str(&format!("                   {}\n", meta.join(" · ")));
        }
        report.push('\n');
    }

    if settings.gaps.show {
        report.push_str("───────────────────────────────────────────────────────────────────\n");
        report.push_str("                         OUTAGES & CHANGES                          \n");
        report.push_str("───────────────────────────────────────────────────────────────────\n\n");

        report.push_str(&gap_section(analysis, &settings.gap_filter(), expand_gaps, &stamp));
    }

    report.push_str("═══════════════════════════════════════════════════════════════════\n");
    report.push_str("                         END OF REPORT                              \n");
    report.push_str("═══════════════════════════════════════════════════════════════════\n");

    report
}

fn gap_section(
    analysis: &AnalysisResult,
    filter: &GapFilter,
    expand: bool,
    stamp: &dyn Fn(DateTime<Utc>) -> String,
) -> String {
    if analysis.is_empty() {
        return "  No log entries to inspect yet.\n\n".to_string();
    }

    let listing = filter.apply(&analysis.gaps, expand);
    if listing.gaps.is_empty() {
        return "  No missed 5-minute intervals detected.\n\n".to_string();
    }

    let mut section = String::new();
    for (i, gap) in listing.gaps.iter().enumerate() {
        let line = match gap {
            Gap::IpChange {
                timestamp,
                old_ip,
                new_ip,
            } => format!("IP address changed from {} to {} at {}", old_ip, new_ip, stamp(*timestamp)),
            Gap::Outage {
                start,
                end,
                missed_checks,
                open,
            } => {
                let end_label = if *open { "now".to_string() } else { stamp(*end) };
                format!(
                    "{} {} missed from {} to {} ({})",
                    missed_checks,
                    if *missed_checks == 1 { "check" } else { "checks" },
                    stamp(*start),
                    end_label,
                    format_duration((*end - *start).num_milliseconds())
                )
            }
        };
        section.push_str(&format!("  {}. {}\n", i + 1, line));
    }

    if !expand && listing.remaining > 0 {
        section.push_str(&format!("  ... {} more (use --all-gaps to show)\n", listing.remaining));
    }
    section.push('\n');
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, h, m, s).unwrap()
    }

    fn analyzer() -> Analyzer<Utc> {
        Analyzer::new(Utc, WindowKind::ALL.to_vec())
    }

    fn line(ts: DateTime<Utc>, ip: &str) -> String {
        format!("{}: Current IP is {}\n", ts.format("%a %b %e %I:%M:%S %p UTC %Y"), ip)
    }

    #[test]
    fn test_scenario_single_missed_check() {
        let text = [at(10, 0, 0), at(10, 5, 0), at(10, 15, 0)]
            .iter()
            .map(|ts| line(*ts, "203.0.113.4"))
            .collect::<String>();

        let result = analyzer().analyze_text(&text, at(10, 16, 0));
        assert_eq!(result.records.len(), 3);
        assert_eq!(
            result.gaps,
            vec![Gap::Outage {
                start: at(10, 10, 0),
                end: at(10, 15, 0),
                missed_checks: 1,
                open: false,
            }]
        );
        assert_eq!(result.missed_checks, 1);
        assert_eq!(result.expected_checks, 4);
        assert_eq!(result.uptime_value, Some(75.0));
        assert_eq!(result.uptime_text, "75.00%");
        assert_eq!(result.first_record, Some(at(10, 0, 0)));
        assert_eq!(result.last_record, Some(at(10, 15, 0)));
    }

    #[test]
    fn test_ip_change_scenario() {
        let text = format!("{}{}", line(at(10, 0, 0), "A"), line(at(10, 5, 0), "B"));
        let result = analyzer().analyze_text(&text, at(10, 6, 0));
        assert_eq!(result.outage_count(), 0);
        assert_eq!(result.gaps.len(), 1);
        assert!(matches!(&result.gaps[0], Gap::IpChange { old_ip, new_ip, .. } if old_ip == "A" && new_ip == "B"));
        assert_eq!(result.uptime_text, "100%");
    }

    #[test]
    fn test_empty_log() {
        let result = analyzer().analyze_text("", at(10, 0, 0));
        assert!(result.records.is_empty());
        assert!(result.gaps.is_empty());
        assert_eq!(result.expected_checks, 0);
        assert_eq!(result.uptime_value, None);
        assert_eq!(result.uptime_text, NO_DATA_PLACEHOLDER);
        assert_eq!(result.window_stats.len(), 5);
        assert!(result
            .window_stats
            .iter()
            .flat_map(|w| w.segments.iter())
            .all(|s| s.expected == 0));
    }

    #[test]
    fn test_single_on_time_record_is_full_uptime() {
        let result = analyzer().analyze(vec![CheckRecord::new(at(10, 0, 0), "A")], at(10, 2, 0));
        assert_eq!(result.expected_checks, 1);
        assert_eq!(result.uptime_value, Some(100.0));
        assert_eq!(result.uptime_text, "100%");
    }

    #[test]
    fn test_trailing_outage_counts_toward_uptime() {
        let now = at(12, 0, 0);
        let result = analyzer().analyze(vec![CheckRecord::new(now - Duration::minutes(20), "A")], now);
        assert_eq!(result.missed_checks, 3);
        assert_eq!(result.expected_checks, 4);
        assert_eq!(result.outage_count(), 1);
    }

    #[test]
    fn test_window_conservation_over_analysis() {
        let now = at(12, 0, 0);
        let records: Vec<CheckRecord> = (0..600)
            .filter(|i| i % 11 != 0)
            .map(|i| CheckRecord::new(now - Duration::minutes(5 * i), "A"))
            .rev()
            .collect();
        let result = analyzer().analyze(records, now);
        for window in &result.window_stats {
            assert_eq!(window.expected, window.segments.iter().map(|s| s.expected).sum::<u64>());
            assert_eq!(window.observed, window.segments.iter().map(|s| s.observed).sum::<u64>());
        }
    }

    #[test]
    fn test_empty_window_selection_enables_all() {
        let analyzer = Analyzer::new(Utc, Vec::new());
        assert_eq!(analyzer.windows(), &WindowKind::ALL);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(None), NO_DATA_PLACEHOLDER);
        assert_eq!(format_percent(Some(f64::NAN)), NO_DATA_PLACEHOLDER);
        assert_eq!(format_percent(Some(99.996)), "100%");
        assert_eq!(format_percent(Some(99.994)), "99.99%");
        assert_eq!(format_percent(Some(5.0)), "5.00%");
        assert_eq!(format_percent(Some(120.0)), "100%");
    }

    #[test]
    fn test_overall_uptime_never_rounds_misses_to_full() {
        let start = at(0, 0, 0) - Duration::days(70);
        let mut records: Vec<CheckRecord> = (0..20_001)
            .map(|i| CheckRecord::new(start + Duration::minutes(5 * i), "A"))
            .collect();
        records.remove(10_000);
        let now = records.last().unwrap().timestamp + Duration::minutes(1);

        let result = analyzer().analyze(records, now);
        assert_eq!(result.missed_checks, 1);
        assert_eq!(result.expected_checks, 20_001);
        assert!(result.uptime_value.unwrap() >= 99.995);
        assert_eq!(result.uptime_text, "99.99%");
    }

    #[test]
    fn test_format_overall_uptime() {
        assert_eq!(format_overall_uptime(None, 0), NO_DATA_PLACEHOLDER);
        assert_eq!(format_overall_uptime(Some(100.0), 0), "100%");
        assert_eq!(format_overall_uptime(Some(99.996), 1), "99.99%");
        assert_eq!(format_overall_uptime(Some(75.0), 1), "75.00%");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "<1 min");
        assert_eq!(format_duration(5 * MINUTE_MS), "5 min");
        assert_eq!(format_duration(HOUR_MS), "1 hr");
        assert_eq!(format_duration(2 * HOUR_MS + 15 * MINUTE_MS), "2 hrs 15 min");
    }

    #[test]
    fn test_report_lists_gaps_and_windows() {
        let text = [at(10, 0, 0), at(10, 5, 0), at(10, 15, 0)]
            .iter()
            .map(|ts| line(*ts, "203.0.113.4"))
            .collect::<String>();
        let result = analyzer().analyze_text(&text, at(10, 16, 0));
        let report = generate_report(&result, &NetworkSettings::default(), &Utc, false);

        assert!(report.contains("75.00%"));
        assert!(report.contains("Past hour"));
        assert!(report.contains("1 check missed from Jan 6, 2025 10:10:00 AM"));
        assert!(report.contains("END OF REPORT"));
    }

    #[test]
    fn test_report_respects_hidden_sections() {
        let mut settings = NetworkSettings::default();
        settings.metrics.show = false;
        settings.gaps.show = false;
        let result = analyzer().analyze_text("", at(10, 0, 0));
        let report = generate_report(&result, &settings, &Utc, false);
        assert!(!report.contains("SUMMARY"));
        assert!(!report.contains("OUTAGES"));
        assert!(report.contains("UPTIME WINDOWS"));
    }
}
