// src/timecard/mod.rs

pub mod duration;
mod normalize;
mod sequence;
mod weekday;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

pub use normalize::normalize;
pub use sequence::fill_gaps;
pub use weekday::{resolve_offset, weekday_for};

/// Weekday alphabet in calendar order (Sunday..Saturday), as printed on
/// Japanese time cards.
pub const WEEKDAYS: [char; 7] = ['日', '月', '火', '水', '木', '金', '土'];

/// One unverified attendance line as returned by the OCR collaborator.
///
/// Every field except `day_int` is kept as a raw `Value` because the
/// collaborator does not reliably honor the requested types: times arrive
/// as strings, numbers, nulls, or the literal string "null".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(default, rename = "dayInt")]
    pub day_int: Option<u32>,
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default, rename = "dayOfWeek")]
    pub day_of_week: Option<Value>,
    #[serde(default, rename = "startTime1")]
    pub start_time1: Option<Value>,
    #[serde(default, rename = "endTime1")]
    pub end_time1: Option<Value>,
    #[serde(default, rename = "startTime2")]
    pub start_time2: Option<Value>,
    #[serde(default, rename = "endTime2")]
    pub end_time2: Option<Value>,
}

/// A normalized, display-ready attendance record for one calendar day.
///
/// Serialized names match the OCR wire shape so stored results stay
/// readable next to raw payload logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    #[serde(rename = "dayInt")]
    pub day_int: u32,
    pub date: String,
    #[serde(rename = "dayOfWeek")]
    pub day_of_week: String,
    #[serde(rename = "startTime1")]
    pub start_time1: String,
    #[serde(rename = "endTime1")]
    pub end_time1: String,
    #[serde(rename = "startTime2")]
    pub start_time2: String,
    #[serde(rename = "endTime2")]
    pub end_time2: String,
}

impl TimeEntry {
    /// Placeholder entry for a day the OCR produced no row for.
    pub fn blank(day_int: u32) -> Self {
        Self {
            day_int,
            date: day_int.to_string(),
            day_of_week: String::new(),
            start_time1: String::new(),
            end_time1: String::new(),
            start_time2: String::new(),
            end_time2: String::new(),
        }
    }

    /// Total worked minutes across both periods. A period contributes
    /// only when both its start and end are non-empty.
    pub fn total_minutes(&self) -> u32 {
        duration::duration_minutes(&self.start_time1, &self.end_time1)
            + duration::duration_minutes(&self.start_time2, &self.end_time2)
    }
}

/// Final outcome of processing one image.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub entries: Vec<TimeEntry>,
    pub detected_name: String,
}

/// Run the full reconstruction over raw OCR rows:
/// normalize → weekday consensus → gap filling.
pub fn reconstruct(rows: Vec<RawRow>) -> Vec<TimeEntry> {
    let entries = normalize(rows);
    let offset = resolve_offset(&entries);
    fill_gaps(entries, offset)
}
