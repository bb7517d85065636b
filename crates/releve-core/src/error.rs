use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("document does not match the expected layout: {0}")]
    Template(String),

    #[error(
        "{scope}: computed balance {computed} does not reconcile with declared {declared} ({difference} diff)"
    )]
    Consistency {
        scope: String,
        computed: Decimal,
        declared: Decimal,
        difference: Decimal,
    },

    #[error("{path} not recognized as a supported bank statement")]
    Unrecognized { path: PathBuf },

    #[error("{0} is not a readable file")]
    NotAFile(PathBuf),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("failed to read PDF structure: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to parse extracted value: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Consistency failure with the difference pre-computed at 2 decimals.
    pub fn mismatch(scope: impl Into<String>, computed: Decimal, declared: Decimal) -> Self {
        ScrapeError::Consistency {
            scope: scope.into(),
            computed: computed.round_dp(2),
            declared: declared.round_dp(2),
            difference: (declared - computed).round_dp(2),
        }
    }
}
