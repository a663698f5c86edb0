use crate::metrics::CheckRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// `Mon Jan  6 09:05:02 AM UTC 2025: Current IP is 203.0.113.4`
static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([A-Za-z]{3} [A-Za-z]{3}\s+\d{1,2} \d{2}:\d{2}:\d{2} (?:AM|PM) [A-Z]{2,5} \d{4}): Current IP is (.+)$",
    )
    .expect("log line pattern is valid")
});

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse raw log text into check records sorted by timestamp.
///
/// Timestamps are read as wall-clock time in `tz`; the zone abbreviation on
/// the line is ignored. Lines that don't match, or whose timestamp cannot be
/// resolved, are skipped.
pub fn parse_log<Tz: TimeZone>(text: &str, tz: &Tz) -> Vec<CheckRecord> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for line in text.lines() {
        let Some(caps) = LINE_PATTERN.captures(line) else {
            if !line.trim().is_empty() {
                skipped += 1;
            }
            continue;
        };

        let Some(timestamp) = parse_timestamp(&caps[1], tz) else {
            debug!(line, "Skipping line with unresolvable timestamp");
            skipped += 1;
            continue;
        };

        records.push(CheckRecord::new(timestamp, caps[2].trim()));
    }

    // stable, so same-instant lines keep log order
    records.sort_by_key(|r| r.timestamp);

    debug!(records = records.len(), skipped, "Parsed check log");
    records
}

/// Parse the `<weekday> <month> <day> <HH:MM:SS> <AM|PM> <zone> <year>` prefix.
pub fn parse_timestamp<Tz: TimeZone>(label: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let naive = parse_naive(label)?;
    // earliest() picks the first instant on a DST fold and yields None in a gap
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_naive(label: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = label.split_whitespace().collect();
    if parts.len() < 7 {
        return None;
    }

    let month = MONTHS.iter().position(|m| *m == parts[1])? as u32 + 1;
    let day: u32 = parts[2].parse().ok()?;

    let mut clock = parts[3].split(':').map(|v| v.parse::<u32>().ok());
    let mut hour = clock.next()??;
    let minute = clock.next()??;
    let second = clock.next()??;

    match parts[4] {
        "PM" if hour != 12 => hour += 12,
        "AM" if hour == 12 => hour = 0,
        _ => {}
    }

    let year: i32 = parts[6].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_single_line() {
        let records = parse_log("Mon Jan  6 09:05:02 AM UTC 2025: Current IP is 203.0.113.4", &Utc);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, utc(2025, 1, 6, 9, 5, 2));
        assert_eq!(records[0].ip, "203.0.113.4");
    }

    #[test]
    fn test_twelve_hour_clock_conversion() {
        let text = "\
Mon Jan  6 12:00:00 AM UTC 2025: Current IP is a
Mon Jan  6 12:30:00 PM UTC 2025: Current IP is b
Mon Jan  6 11:59:59 PM UTC 2025: Current IP is c
";
        let records = parse_log(text, &Utc);
        let hours: Vec<u32> = records.iter().map(|r| r.timestamp.hour()).collect();
        assert_eq!(hours, vec![0, 12, 23]);
    }

    #[test]
    fn test_skips_malformed_lines() {
        let text = "\n\
garbage line\n\
Mon Jan  6 09:05:02 AM UTC 2025: Current IP is 203.0.113.4\n\
Mon Foo  6 09:10:02 AM UTC 2025: Current IP is 203.0.113.4\n\
Mon Feb 30 09:10:02 AM UTC 2025: Current IP is 203.0.113.4\n\
Mon Jan  6 09:10:0\n";
        let records = parse_log(text, &Utc);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_sorts_out_of_order_input() {
        let text = "\
Mon Jan  6 10:05:00 AM UTC 2025: Current IP is b\r
Mon Jan  6 10:00:00 AM UTC 2025: Current IP is a\r
";
        let records = parse_log(text, &Utc);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ip, "a");
        assert_eq!(records[1].ip, "b");
        assert!(records[0].timestamp < records[1].timestamp);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_log("", &Utc).is_empty());
        assert!(parse_log("\n\n   \n", &Utc).is_empty());
    }

    #[test]
    fn test_local_zone_applied() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let ts = parse_timestamp("Mon Jan  6 09:05:02 AM CET 2025", &tz).unwrap();
        assert_eq!(ts, utc(2025, 1, 6, 7, 5, 2));
    }

    #[test]
    fn test_ip_is_trimmed() {
        let records = parse_log("Tue Jan  7 01:00:00 PM EST 2025: Current IP is   host.example  ", &Utc);
        assert_eq!(records[0].ip, "host.example");
    }
}
