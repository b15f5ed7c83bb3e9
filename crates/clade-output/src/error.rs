//! Formatting errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The input cannot be represented in the requested format.
    #[error("{0}")]
    Unsupported(String),

    #[error("formatter panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, FormatError>;
