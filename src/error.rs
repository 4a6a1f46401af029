use chrono::NaiveDateTime;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input has no header row")]
    MissingHeader,

    #[error("Required column '{column}' not found in header")]
    MissingColumn { column: String },

    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Unknown pollutant: '{0}'")]
    UnknownPollutant(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl ProcessingError {
    /// Source could not be read at all, or its header lacks a mandatory column.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            ProcessingError::Io(_)
                | ProcessingError::Csv(_)
                | ProcessingError::MissingHeader
                | ProcessingError::MissingColumn { .. }
        )
    }

    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            ProcessingError::InvalidParameter(_) | ProcessingError::UnknownPollutant(_)
        )
    }
}
