use thiserror::Error;

/// Crate-wide error type.
///
/// `Extraction` and `Export` are recoverable at the batch level: one
/// image's failure is recorded and the batch continues. `Config` is
/// fatal before any OCR call is made.
#[derive(Error, Debug)]
pub enum Error {
    /// Required credential or config value absent or unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// OCR collaborator returned no parseable payload, or no usable rows
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Spreadsheet write-back failed
    #[error("sheet export failed: {0}")]
    Export(String),

    /// Local result/usage database errors
    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
