// src/sheet_export.rs

use crate::error::Error;
use crate::timecard::{TimeEntry, duration};
use reqwest::Client;
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Column header for every exported sheet.
const SHEET_HEADER: [&str; 6] = ["日付", "開始1", "終了1", "開始2", "終了2", "合計"];

/// Label of the trailing grand-total row.
const GRAND_TOTAL_LABEL: &str = "総合計時間";

/// Build the tabular form of one attendance table: header, one row per
/// entry, trailing grand-total row. Total cells carry a leading apostrophe
/// so spreadsheets keep them as text instead of reading "9:00" as a
/// time-of-day.
pub fn build_sheet_rows(entries: &[TimeEntry]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(entries.len() + 2);
    rows.push(SHEET_HEADER.iter().map(|h| h.to_string()).collect());

    let mut total_minutes = 0u32;
    for entry in entries {
        let row_total = entry.total_minutes();
        total_minutes += row_total;
        rows.push(vec![
            entry.date.clone(),
            entry.start_time1.clone(),
            entry.end_time1.clone(),
            entry.start_time2.clone(),
            entry.end_time2.clone(),
            format!("'{}", duration::format_minutes(row_total)),
        ]);
    }

    let mut total_row = vec![GRAND_TOTAL_LABEL.to_string()];
    total_row.extend(std::iter::repeat_n(String::new(), 4));
    total_row.push(format!("'{}", duration::format_minutes(total_minutes)));
    rows.push(total_row);

    rows
}

/// Pick a sheet name that is unique within the workbook: the detected
/// name ("null" when empty), suffixed 2, 3, ... on collision.
pub fn unique_sheet_name(used: &mut HashSet<String>, detected_name: &str) -> String {
    let base = if detected_name.is_empty() {
        "null"
    } else {
        detected_name
    };

    let mut name = base.to_string();
    let mut counter = 2;
    while used.contains(&name) {
        name = format!("{base}{counter}");
        counter += 1;
    }
    used.insert(name.clone());
    name
}

/// POST one attendance table to the Apps Script web app.
///
/// Fire-and-forget: the response body is ignored, only a transport error
/// or non-success status counts as failure.
pub async fn export_to_sheet(
    client: &Client,
    gas_url: &str,
    spreadsheet_id: &str,
    sheet_name: &str,
    entries: &[TimeEntry],
) -> Result<(), Error> {
    if entries.is_empty() {
        return Ok(());
    }

    let body = json!({
        "spreadsheetId": spreadsheet_id,
        "sheetName": sheet_name,
        "values": build_sheet_rows(entries),
    });

    let response = client
        .post(gas_url)
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Export(e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::Export(format!(
            "GAS endpoint returned {}",
            response.status()
        )));
    }

    info!(sheet = %sheet_name, rows = entries.len(), "Exported to spreadsheet");
    Ok(())
}

/// Write one CSV file per table under `dir/勤怠データ_{date_stamp}/`,
/// using the same rows the spreadsheet export sends.
pub fn write_csv_bundle(
    dir: impl AsRef<Path>,
    date_stamp: &str,
    tables: &[(String, Vec<Vec<String>>)],
) -> Result<(), Error> {
    let bundle_dir = dir.as_ref().join(format!("勤怠データ_{date_stamp}"));
    fs::create_dir_all(&bundle_dir)?;

    for (sheet_name, rows) in tables {
        let mut out = String::new();
        for row in rows {
            let line: Vec<String> = row.iter().map(|cell| csv_escape(cell)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        fs::write(bundle_dir.join(format!("{sheet_name}.csv")), out)?;
    }

    info!(dir = %bundle_dir.display(), sheets = tables.len(), "Wrote CSV bundle");
    Ok(())
}

fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
