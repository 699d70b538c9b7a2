// src/timecard/normalize.rs

use super::{RawRow, TimeEntry};
use serde_json::Value;
use tracing::{debug, warn};

/// Largest day number that can appear on a monthly time card. Rows
/// beyond this are OCR misreads; sequencing them would expand the
/// gap-filled range to garbage sizes.
const MAX_DAY: u32 = 31;

/// Coerce an untrusted OCR field to a plain string. Nulls, absent values,
/// and the literal string "null" all become the empty string; anything
/// else is stringified as-is.
fn clean_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) if s == "null" => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Clean raw OCR rows into partially-finalized entries.
///
/// Rows without a day number cannot be placed in the sequence and are
/// dropped, as are rows whose day number falls outside `1..=31` (a
/// misread day would otherwise stretch the gap-filled range). The rest
/// are coerced to all-string fields and stably sorted by day number.
/// Duplicate days are kept; the sequencer resolves them.
pub fn normalize(rows: Vec<RawRow>) -> Vec<TimeEntry> {
    let total = rows.len();

    let mut entries: Vec<TimeEntry> = rows
        .into_iter()
        .filter_map(|row| {
            let day_int = row.day_int?;
            if day_int == 0 || day_int > MAX_DAY {
                warn!(day = day_int, "Dropping row with impossible day number");
                return None;
            }
            Some(TimeEntry {
                day_int,
                date: clean_field(row.date.as_ref()),
                day_of_week: clean_field(row.day_of_week.as_ref()),
                start_time1: clean_field(row.start_time1.as_ref()),
                end_time1: clean_field(row.end_time1.as_ref()),
                start_time2: clean_field(row.start_time2.as_ref()),
                end_time2: clean_field(row.end_time2.as_ref()),
            })
        })
        .collect();

    if entries.len() < total {
        debug!(
            dropped = total - entries.len(),
            kept = entries.len(),
            "Dropped rows that cannot be sequenced"
        );
    }

    entries.sort_by_key(|e| e.day_int);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(day: Option<u32>) -> RawRow {
        RawRow {
            day_int: day,
            ..Default::default()
        }
    }

    #[test]
    fn test_null_coercion() {
        let raw = RawRow {
            day_int: Some(1),
            start_time1: Some(json!("9:00")),
            end_time1: None,
            start_time2: Some(Value::Null),
            end_time2: Some(json!("null")),
            ..Default::default()
        };

        let entries = normalize(vec![raw]);
        assert_eq!(entries[0].start_time1, "9:00");
        assert_eq!(entries[0].end_time1, "");
        assert_eq!(entries[0].start_time2, "");
        assert_eq!(entries[0].end_time2, "");
    }

    #[test]
    fn test_numeric_values_stringified() {
        let raw = RawRow {
            day_int: Some(3),
            date: Some(json!(3)),
            ..Default::default()
        };
        let entries = normalize(vec![raw]);
        assert_eq!(entries[0].date, "3");
    }

    #[test]
    fn test_rows_without_day_dropped() {
        let entries = normalize(vec![row(None), row(Some(2)), row(None)]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].day_int, 2);
    }

    #[test]
    fn test_impossible_day_numbers_dropped() {
        let entries = normalize(vec![
            row(Some(0)),
            row(Some(5)),
            row(Some(32)),
            row(Some(4_000_000_000)),
            row(Some(u32::MAX)),
        ]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].day_int, 5);
    }

    #[test]
    fn test_sorted_by_day() {
        let entries = normalize(vec![row(Some(15)), row(Some(2)), row(Some(9))]);
        let days: Vec<u32> = entries.iter().map(|e| e.day_int).collect();
        assert_eq!(days, vec![2, 9, 15]);
    }

    #[test]
    fn test_duplicates_kept() {
        let entries = normalize(vec![row(Some(4)), row(Some(4))]);
        assert_eq!(entries.len(), 2);
    }
}
