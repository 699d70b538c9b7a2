// src/timecard/sequence.rs

use super::{TimeEntry, weekday_for};
use tracing::warn;

/// Expand sorted entries into one entry per day over the observed range.
///
/// Every day in `[minDay, maxDay]` gets exactly one entry: observed days
/// keep their times, missing days are synthesized blank. The consensus
/// weekday overwrites every entry's label (a lone deviating label loses
/// to the sheet-wide offset). Display formatting runs last so synthesized
/// rows are formatted the same way as observed ones.
///
/// Duplicate day numbers: last-seen wins, with a warning.
pub fn fill_gaps(entries: Vec<TimeEntry>, offset: Option<u32>) -> Vec<TimeEntry> {
    let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
        return Vec::new();
    };
    let (min_day, max_day) = (first.day_int, last.day_int);

    let mut filled = Vec::with_capacity((max_day - min_day + 1) as usize);

    for day in min_day..=max_day {
        let matches: Vec<&TimeEntry> = entries.iter().filter(|e| e.day_int == day).collect();
        if matches.len() > 1 {
            warn!(day, count = matches.len(), "Duplicate rows for day, keeping last");
        }

        // Entries are sorted, so the last match is the last-seen raw row.
        let mut entry = match matches.last() {
            Some(found) => (*found).clone(),
            None => TimeEntry::blank(day),
        };

        entry.day_of_week = match offset {
            Some(off) => weekday_for(day, off).to_string(),
            None => String::new(),
        };

        entry.date = format_date(&entry);
        filled.push(entry);
    }

    filled
}

/// "20土" style display label: the numeric part of the raw date label
/// (falling back to the day number when OCR left no digits), plus the
/// resolved weekday character when one exists.
fn format_date(entry: &TimeEntry) -> String {
    let digits: String = entry.date.chars().filter(char::is_ascii_digit).collect();
    let digits = if digits.is_empty() {
        entry.day_int.to_string()
    } else {
        digits
    };

    if entry.day_of_week.is_empty() {
        digits
    } else {
        format!("{digits}{}", entry.day_of_week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(day: u32, start1: &str, end1: &str) -> TimeEntry {
        TimeEntry {
            date: day.to_string(),
            start_time1: start1.to_string(),
            end_time1: end1.to_string(),
            ..TimeEntry::blank(day)
        }
    }

    #[test]
    fn test_gap_synthesized() {
        let input = vec![entry(1, "9:00", "17:00"), entry(3, "9:00", "17:00")];
        let out = fill_gaps(input, Some(4));

        assert_eq!(out.len(), 3);
        let days: Vec<u32> = out.iter().map(|e| e.day_int).collect();
        assert_eq!(days, vec![1, 2, 3]);

        let gap = &out[1];
        assert_eq!(gap.start_time1, "");
        assert_eq!(gap.end_time1, "");
        assert_eq!(gap.start_time2, "");
        assert_eq!(gap.end_time2, "");
        assert_eq!(gap.day_of_week, weekday_for(2, 4).to_string());
    }

    #[test]
    fn test_range_is_contiguous_and_unique() {
        let input = vec![entry(3, "", ""), entry(7, "", ""), entry(20, "", "")];
        let out = fill_gaps(input, None);

        assert_eq!(out.len(), 18);
        for (i, e) in out.iter().enumerate() {
            assert_eq!(e.day_int, 3 + i as u32);
        }
    }

    #[test]
    fn test_consensus_overwrites_existing_label() {
        let mut e = entry(5, "9:00", "17:00");
        e.day_of_week = "日".to_string(); // inconsistent with offset 4 (火)
        let out = fill_gaps(vec![e], Some(4));
        assert_eq!(out[0].day_of_week, "火");
        assert_eq!(out[0].date, "5火");
    }

    #[test]
    fn test_no_offset_leaves_labels_empty() {
        let mut e = entry(5, "", "");
        e.day_of_week = "火".to_string();
        let out = fill_gaps(vec![e], None);
        assert_eq!(out[0].day_of_week, "");
        assert_eq!(out[0].date, "5");
    }

    #[test]
    fn test_duplicate_day_last_wins() {
        let first = entry(4, "8:00", "12:00");
        let second = entry(4, "9:00", "17:00");
        let out = fill_gaps(vec![first, second], None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start_time1, "9:00");
    }

    #[test]
    fn test_date_digits_fallback() {
        let mut e = entry(12, "", "");
        e.date = "１２日".to_string(); // full-width digits leave no ASCII digits
        let out = fill_gaps(vec![e], None);
        assert_eq!(out[0].date, "12");
    }

    #[test]
    fn test_empty_input() {
        assert!(fill_gaps(Vec::new(), Some(0)).is_empty());
    }
}
