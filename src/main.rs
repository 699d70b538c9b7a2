mod batch;
mod config;
mod error;
mod ocr_extract;
mod result_db;
mod sheet_export;
mod timecard;
mod usage;

use batch::{BatchProcessor, SheetTarget, SourceImage, UsageRecorder};
use error::Error;
use ocr_extract::LlmOcr;
use result_db::{ResultStore, StoredResult};
use sheet_export::{build_sheet_rows, unique_sheet_name, write_csv_bundle};
use std::collections::HashSet;
use std::path::Path;
use time::OffsetDateTime;
use tracing::info;
use usage::{Identity, UsageStore};

fn config_path() -> String {
    std::env::var("TIMECARD_OCR_CONFIG").unwrap_or_else(|_| ".config/timecard_ocr.toml".to_string())
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Calendar date key for the usage counter, UTC.
fn today() -> String {
    let d = OffsetDateTime::now_utc().date();
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}

/// Date stamp for the CSV bundle directory name.
fn date_stamp() -> String {
    let d = OffsetDateTime::now_utc().date();
    format!("{:04}{:02}{:02}", d.year(), u8::from(d.month()), d.day())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter("info")
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        return Err(Error::Config("usage: timecard_ocr <image>...".into()).into());
    }

    let cfg = config::Config::load(config_path())?;
    let store = ResultStore::new(&cfg.db_path)?;

    let identity = if cfg.account.is_empty() {
        Identity::Guest
    } else {
        Identity::Account(cfg.account.clone())
    };
    let date = today();

    // Quota gate, before any OCR call
    if !cfg.premium {
        let used = store.get(&identity, &date)?;
        if used >= cfg.daily_limit {
            return Err(Error::Config(format!(
                "daily limit reached ({used}/{} today), try again tomorrow",
                cfg.daily_limit
            ))
            .into());
        }
    }

    let mut images = Vec::with_capacity(args.len());
    for arg in &args {
        let path = Path::new(arg);
        let bytes = std::fs::read(path)?;
        images.push(SourceImage {
            file_name: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(arg)
                .to_string(),
            mime_type: mime_for(path).to_string(),
            bytes,
        });
    }

    let ocr = LlmOcr::new(&cfg.llm)?;
    ocr.ensure_reachable(&cfg.llm).await?;

    let sheet = if cfg.sheet.spreadsheet_id.is_empty() {
        None
    } else {
        if cfg.sheet.gas_url.is_empty() {
            return Err(Error::Config(
                "sheet.gas_url required when sheet.spreadsheet_id is set".into(),
            )
            .into());
        }
        Some(SheetTarget {
            client: reqwest::Client::new(),
            gas_url: cfg.sheet.gas_url.clone(),
            spreadsheet_id: cfg.sheet.spreadsheet_id.clone(),
        })
    };

    let usage = (!cfg.premium).then(|| UsageRecorder {
        store: &store,
        identity: identity.clone(),
        date: date.clone(),
        limit: cfg.daily_limit,
    });

    let sheet_configured = sheet.is_some();
    let processor = BatchProcessor::new(&ocr, sheet, usage);
    let outcome = processor.run(&images).await?;

    // Persist every outcome, failed slots included
    for (image, result) in images.iter().zip(&outcome.results) {
        let detected_name = if result.succeeded && result.detected_name.is_empty() {
            "検出なし".to_string()
        } else {
            result.detected_name.clone()
        };
        store.upsert_result(&StoredResult {
            uid: ResultStore::generate_uid(&image.file_name, &image.bytes),
            file_name: result.file_name.clone(),
            detected_name,
            status: if result.succeeded { "ok" } else { "failed" }.to_string(),
            entries: result.entries.clone(),
        })?;
    }

    if !cfg.csv_dir.is_empty() {
        let mut used_names = HashSet::new();
        let tables: Vec<(String, Vec<Vec<String>>)> = outcome
            .results
            .iter()
            .filter(|r| r.succeeded)
            .map(|r| {
                (
                    unique_sheet_name(&mut used_names, &r.detected_name),
                    build_sheet_rows(&r.entries),
                )
            })
            .collect();
        write_csv_bundle(&cfg.csv_dir, &date_stamp(), &tables)?;
    }

    if sheet_configured {
        info!(
            extracted = outcome.success_count,
            exported = outcome.success_count - outcome.export_failures,
            export_failures = outcome.export_failures,
            "Batch complete"
        );
    } else {
        info!(extracted = outcome.success_count, "Batch complete");
    }

    // Print statistics
    let (total, succeeded) = store.get_counts()?;
    info!(
        results_total = total,
        results_succeeded = succeeded,
        "Database statistics"
    );

    Ok(())
}
