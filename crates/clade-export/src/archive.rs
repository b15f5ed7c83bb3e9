//! Zip archive assembly.

use std::io::{Cursor, Write};

use clade_model::ZipEntry;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::{ExportError, Result};

/// Build a deflated zip archive holding `entries` in order.
pub fn build_zip(entries: &[ZipEntry]) -> Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in entries {
        if entry.filename.is_empty() || entry.filename.starts_with('/') {
            return Err(ExportError::InvalidFilename(entry.filename.clone()));
        }
        zip.start_file(entry.filename.as_str(), options)?;
        zip.write_all(entry.data.as_bytes())
            .map_err(|source| ExportError::Io {
                operation: "compress",
                path: entry.filename.clone().into(),
                source,
            })?;
    }
    Ok(zip.finish()?.into_inner())
}
