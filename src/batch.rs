// src/batch.rs

use crate::error::Error;
use crate::ocr_extract::TimecardOcr;
use crate::sheet_export;
use crate::timecard::TimeEntry;
use crate::usage::{Identity, UsageStore};
use reqwest::Client;
use tracing::{error, info, warn};

/// Sentinel detected-name recorded for an image whose extraction failed.
pub const FAILED_NAME: &str = "エラー";

/// One image queued for processing.
pub struct SourceImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Outcome for one image. A failed image keeps its slot in the batch with
/// empty entries and the sentinel name.
#[derive(Debug)]
pub struct ProcessingResult {
    pub file_name: String,
    pub detected_name: String,
    pub entries: Vec<TimeEntry>,
    pub succeeded: bool,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: Vec<ProcessingResult>,
    pub success_count: usize,
    pub export_failures: usize,
}

/// Spreadsheet write-back target for each successful image.
pub struct SheetTarget {
    pub client: Client,
    pub gas_url: String,
    pub spreadsheet_id: String,
}

/// Quota attribution for successful extractions. The limit is enforced
/// before every image, not just once up front, so a large batch cannot
/// run past the daily allowance.
pub struct UsageRecorder<'a> {
    pub store: &'a dyn UsageStore,
    pub identity: Identity,
    pub date: String,
    pub limit: u32,
}

pub struct BatchProcessor<'a> {
    ocr: &'a dyn TimecardOcr,
    sheet: Option<SheetTarget>,
    usage: Option<UsageRecorder<'a>>,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(
        ocr: &'a dyn TimecardOcr,
        sheet: Option<SheetTarget>,
        usage: Option<UsageRecorder<'a>>,
    ) -> Self {
        Self { ocr, sheet, usage }
    }

    /// Process images strictly in order.
    ///
    /// Sequential on purpose: it bounds load on the OCR service's rate
    /// limits, keeps the `i / N` progress report deterministic, and
    /// isolates per-image failure without cancellation plumbing. One
    /// image's extraction or export failure never aborts its siblings;
    /// only zero successes across the whole batch is an error.
    pub async fn run(&self, images: &[SourceImage]) -> Result<BatchOutcome, Error> {
        let total = images.len();
        let mut outcome = BatchOutcome::default();
        let mut last_error: Option<Error> = None;

        for (i, image) in images.iter().enumerate() {
            if let Some(usage) = &self.usage {
                if usage.store.get(&usage.identity, &usage.date)? >= usage.limit {
                    warn!(
                        processed = i,
                        total, "Daily limit reached, skipping remaining images"
                    );
                    break;
                }
            }

            info!(current = i + 1, total, file = %image.file_name, "Analyzing image");

            match self.ocr.analyze(&image.bytes, &image.mime_type).await {
                Ok(result) => {
                    if let Some(sheet) = &self.sheet {
                        info!(current = i + 1, total, "Exporting to spreadsheet");
                        // Empty name falls back to "null"; the Apps Script
                        // side uniquifies repeated sheet names itself.
                        let sheet_name = if result.detected_name.is_empty() {
                            "null"
                        } else {
                            result.detected_name.as_str()
                        };
                        if let Err(e) = sheet_export::export_to_sheet(
                            &sheet.client,
                            &sheet.gas_url,
                            &sheet.spreadsheet_id,
                            sheet_name,
                            &result.entries,
                        )
                        .await
                        {
                            warn!(file = %image.file_name, error = %e, "Sheet export failed");
                            outcome.export_failures += 1;
                        }
                    }

                    outcome.results.push(ProcessingResult {
                        file_name: image.file_name.clone(),
                        detected_name: result.detected_name,
                        entries: result.entries,
                        succeeded: true,
                    });
                    outcome.success_count += 1;

                    if let Some(usage) = &self.usage {
                        let count = usage.store.increment(&usage.identity, &usage.date)?;
                        info!(count, "Usage recorded");
                    }
                }
                Err(e) => {
                    error!(file = %image.file_name, error = %e, "Extraction failed");
                    outcome.results.push(ProcessingResult {
                        file_name: image.file_name.clone(),
                        detected_name: FAILED_NAME.to_string(),
                        entries: Vec::new(),
                        succeeded: false,
                    });
                    last_error = Some(e);
                }
            }
        }

        // A quota stop with no attempts is not a failure; only a batch
        // where every attempted image errored escalates.
        if outcome.success_count == 0 {
            if let Some(e) = last_error {
                return Err(Error::Extraction(format!(
                    "all {total} images failed, last error: {e}"
                )));
            }
        }

        Ok(outcome)
    }
}
