// src/timecard/duration.rs

use regex::Regex;

/// Parse a clock string ("9:00", "18:5", bare "9") into minutes since
/// midnight. Minutes are optional and default to 0. Returns `None` when
/// no hour can be read.
fn parse_clock(s: &str) -> Option<i64> {
    let re = Regex::new(r"^\s*(\d+)(?::(\d+))?").ok()?;
    let cap = re.captures(s)?;
    let hours: i64 = cap[1].parse().ok()?;
    let minutes: i64 = cap.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    Some(hours * 60 + minutes)
}

/// Elapsed minutes between two clock strings.
///
/// OCR noise is expected here: either side empty or unreadable yields 0,
/// and a span that comes out negative clamps to 0. Never panics.
pub fn duration_minutes(start: &str, end: &str) -> u32 {
    if start.is_empty() || end.is_empty() {
        return 0;
    }
    let (Some(s), Some(e)) = (parse_clock(start), parse_clock(end)) else {
        return 0;
    };
    (e - s).max(0) as u32
}

/// Display form of a minute total: "{h}:{mm}". Zero renders as the empty
/// string; a zero-minute day is indistinguishable from a day with no
/// data and renders as no data.
pub fn format_minutes(total: u32) -> String {
    if total == 0 {
        return String::new();
    }
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_span() {
        assert_eq!(duration_minutes("9:00", "12:30"), 210);
        assert_eq!(format_minutes(210), "3:30");
    }

    #[test]
    fn test_missing_side_is_zero() {
        assert_eq!(duration_minutes("", "18:00"), 0);
        assert_eq!(duration_minutes("9:00", ""), 0);
        assert_eq!(format_minutes(0), "");
    }

    #[test]
    fn test_unparsable_is_zero() {
        assert_eq!(duration_minutes("??", "18:00"), 0);
        assert_eq!(duration_minutes("9:00", "abc"), 0);
    }

    #[test]
    fn test_bare_hour() {
        // "9" reads as 9:00
        assert_eq!(duration_minutes("9", "17:30"), 510);
    }

    #[test]
    fn test_negative_span_clamps() {
        assert_eq!(duration_minutes("18:00", "9:00"), 0);
    }

    #[test]
    fn test_format_whole_hours() {
        assert_eq!(format_minutes(540), "9:00");
        assert_eq!(format_minutes(65), "1:05");
    }
}
