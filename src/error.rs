use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConversionError>;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GeoPackage write error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Could not move output into place: {0}")]
    Persist(#[from] tempfile::PathPersistError),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Invalid output path {}: {reason}", path.display())]
    OutputPathInvalid { path: PathBuf, reason: String },

    #[error("Line {line}: expected {expected} fields, found {found}: {row:?}")]
    SchemaMismatch {
        line: u64,
        expected: usize,
        found: usize,
        row: Vec<String>,
    },

    #[error("Line {line}: cannot parse {field} value '{value}' as a coordinate")]
    GeometryError {
        line: u64,
        field: String,
        value: String,
    },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl ConversionError {
    /// Errors tied to a single input row, as opposed to the run as a whole.
    pub fn is_row_error(&self) -> bool {
        matches!(
            self,
            ConversionError::SchemaMismatch { .. } | ConversionError::GeometryError { .. }
        )
    }

    /// Source line of a row error.
    pub fn line(&self) -> Option<u64> {
        match self {
            ConversionError::SchemaMismatch { line, .. }
            | ConversionError::GeometryError { line, .. } => Some(*line),
            _ => None,
        }
    }
}
