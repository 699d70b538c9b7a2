// src/timecard/weekday.rs

use super::{TimeEntry, WEEKDAYS};
use tracing::debug;

/// Weekday character for `day_int` under a resolved offset.
pub fn weekday_for(day_int: u32, offset: u32) -> char {
    WEEKDAYS[((day_int + offset) % 7) as usize]
}

/// Weekday index of a raw label, after stripping the parenthesis
/// characters OCR sometimes keeps from "(火)" style cells.
fn weekday_index(label: &str) -> Option<u32> {
    let cleaned: String = label.chars().filter(|c| *c != '(' && *c != ')').collect();
    WEEKDAYS
        .iter()
        .position(|w| cleaned == w.to_string())
        .map(|i| i as u32)
}

/// Infer the single day-number-to-weekday offset for the whole sheet.
///
/// Individual OCR weekday labels are independently unreliable, but for one
/// calendar month the mapping is a fixed arithmetic shift. Each row with a
/// readable label votes for the offset that would make it correct; the
/// majority wins. Ties are broken deterministically: scanning entries in
/// ascending day order, the first offset to reach the maximal count keeps
/// it.
///
/// Returns `None` when no row carries a readable label.
pub fn resolve_offset(entries: &[TimeEntry]) -> Option<u32> {
    let mut tallies = [0u32; 7];
    let mut best: Option<u32> = None;
    let mut best_count = 0u32;
    let mut votes = 0u32;

    for entry in entries {
        let Some(index) = weekday_index(&entry.day_of_week) else {
            continue;
        };
        let candidate = (index as i64 - entry.day_int as i64).rem_euclid(7) as usize;
        tallies[candidate] += 1;
        votes += 1;
        if tallies[candidate] > best_count {
            best_count = tallies[candidate];
            best = Some(candidate as u32);
        }
    }

    debug!(?best, votes, "Weekday consensus");
    best
}
