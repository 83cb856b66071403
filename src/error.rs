use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Dimension mismatch: expected {expected} elements, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Failed to read {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path} at line {line}: {message}", path = path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("No alpha-carbon atoms found in {}", .0.display())]
    EmptyStructure(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
