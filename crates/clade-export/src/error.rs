//! Export error types.
//!
//! Every failure of an export action ends up here, and from here in the
//! [`ErrorSlot`](crate::ErrorSlot).

use std::path::PathBuf;
use std::time::Duration;

use clade_model::ModelError;
use clade_output::FormatError;
use thiserror::Error;

use crate::kind::ExportKind;

#[derive(Debug, Error)]
pub enum ExportError {
    /// A broken invariant upstream of the exporter.
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// The formatter rejected the input.
    #[error("failed to format results: {0}")]
    Format(#[from] FormatError),

    #[error("serialization worker is not available")]
    WorkerUnavailable,

    #[error("serialization worker did not answer a {job} request within {timeout:?}")]
    WorkerTimeout { job: &'static str, timeout: Duration },

    /// The export needs data the dataset does not carry.
    #[error("{kind} export is not available for dataset '{dataset}'")]
    Unavailable { kind: ExportKind, dataset: String },

    #[error("{kind} export needs a dataset name")]
    DatasetRequired { kind: ExportKind },

    #[error("invalid output filename '{0}'")]
    InvalidFilename(String),

    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl ExportError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error indicates a bug rather than bad input or I/O.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Model(ModelError::MalformedOutcome { .. })
                | Self::Format(FormatError::Panicked(_))
        )
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Internal(message) => {
                format!("Something went wrong inside the exporter: {message}. Please report this.")
            }
            Self::Model(error) => error.to_string(),
            Self::Format(error) => format!("The results could not be formatted: {error}"),
            Self::WorkerUnavailable => {
                "The background formatter stopped unexpectedly. Try the export again.".to_string()
            }
            Self::WorkerTimeout { timeout, .. } => format!(
                "The background formatter did not finish within {} seconds.",
                timeout.as_secs_f32()
            ),
            Self::Unavailable { kind, dataset } => {
                format!("Dataset '{dataset}' has no data for a {kind} export.")
            }
            Self::DatasetRequired { kind } => {
                format!("Choose a dataset for the {kind} export.")
            }
            Self::InvalidFilename(name) => {
                format!("'{name}' cannot be used as an output file name.")
            }
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the file at {}", operation, path.display()),
            Self::Base64(_) => "The workbook payload was corrupted.".to_string(),
            Self::Zip(error) => format!("The archive could not be written: {error}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
