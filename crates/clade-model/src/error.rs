//! Model error types.

use thiserror::Error;

/// Error raised while loading or validating model values.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An outcome that carries both a result and an error, or neither.
    #[error("internal error: outcome #{index} ('{seq_name}') {reason}")]
    MalformedOutcome {
        index: usize,
        seq_name: String,
        reason: &'static str,
    },

    /// A column or category name in a selection that is not part of the layout.
    #[error("{message}")]
    UnknownColumn { name: String, message: String },

    /// A category or column name appearing twice in a layout.
    #[error("duplicate {kind} name '{name}' in column layout")]
    DuplicateColumn { kind: &'static str, name: String },

    #[error("duplicate dataset name '{0}'")]
    DuplicateDataset(String),

    #[error("dataset name must not be empty")]
    EmptyDatasetName,

    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
