use thiserror::Error;

#[derive(Error, Debug)]
pub enum RatioAnalysisError {
    #[error("Invalid report date '{0}': expected YYYY-MM-DD, an RFC 3339 timestamp or epoch seconds")]
    InvalidReportDate(String),

    #[error("Line item '{line_item}' has {found} values but the statement has {expected} report dates")]
    ShapeMismatch {
        line_item: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid decimal precision {0}: must be between 0 and {max}", max = crate::report::MAX_DECIMALS)]
    InvalidPrecision(u32),

    #[error("Invalid year range: start {start} is after end {end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("Unknown ratio '{0}'")]
    UnknownRatio(String),

    #[error("Invalid cell '{value}' for {ratio} ({year})")]
    InvalidCell {
        ratio: String,
        year: String,
        value: String,
    },

    #[error("Fetch failed for {ticker}: {reason}")]
    FetchFailed { ticker: String, reason: String },

    #[cfg(feature = "yahoo")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RatioAnalysisError>;
