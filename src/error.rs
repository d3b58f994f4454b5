//! Error taxonomy for the pivot pipeline.
//!
//! Upload failures and processing failures are kept apart because the
//! session surfaces a different message for each. Soft data-quality problems
//! (unparseable numbers or dates) never become errors.

use std::path::PathBuf;

use thiserror::Error;

pub const UPLOAD_FAILED_MESSAGE: &str =
    "Failed to parse the file. Please upload a valid spreadsheet.";
pub const PROCESSING_FAILED_MESSAGE: &str =
    "Data processing failed. Please check the configuration.";

/// Errors raised while loading a spreadsheet or aggregating its rows.
#[derive(Debug, Error)]
pub enum PivotError {
    /// The file could not be read or decoded as a spreadsheet.
    #[error("failed to parse {path}: {message}")]
    FileParse { path: PathBuf, message: String },

    /// The file extension is not a supported spreadsheet format.
    #[error("unsupported spreadsheet format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// The first sheet has no header row.
    #[error("spreadsheet has no header row: {path}")]
    EmptySheet { path: PathBuf },

    /// A requested column is not part of the dataset.
    #[error("column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Aggregation finished without producing a single point.
    #[error("aggregation over '{column}' produced no data points")]
    EmptyResult { column: String },

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl PivotError {
    pub fn is_upload_error(&self) -> bool {
        matches!(
            self,
            PivotError::FileParse { .. }
                | PivotError::UnsupportedFormat { .. }
                | PivotError::EmptySheet { .. }
        )
    }

    /// The single message shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        if self.is_upload_error() {
            UPLOAD_FAILED_MESSAGE
        } else {
            PROCESSING_FAILED_MESSAGE
        }
    }
}

pub type Result<T, E = PivotError> = std::result::Result<T, E>;
