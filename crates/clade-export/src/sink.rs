//! Destinations for finished export artifacts.
//!
//! The orchestrator never touches storage itself. It hands each artifact to
//! a [`FileSink`], always from a blocking thread.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clade_model::{ZipEntry, mime};
use tracing::info;

use crate::archive::build_zip;
use crate::error::{ExportError, Result};

/// What a sink did with one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub filename: String,
    pub mime: String,
    pub bytes: usize,
    /// Where the artifact ended up, for sinks that write to disk.
    pub path: Option<PathBuf>,
}

pub trait FileSink: Send + Sync {
    fn save_file(&self, content: &str, filename: &str, mime: &str) -> Result<SavedArtifact>;

    /// Save binary content delivered as base64.
    fn save_base64_file(&self, base64: &str, filename: &str, mime: &str) -> Result<SavedArtifact>;

    fn save_zip(&self, entries: &[ZipEntry], filename: &str) -> Result<SavedArtifact>;
}

/// Writes artifacts into a directory.
///
/// Each file is written to a temporary sibling, synced and then renamed into
/// place, so a failed export never leaves a truncated file behind.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target(&self, filename: &str) -> Result<PathBuf> {
        let relative = Path::new(filename);
        let valid = !filename.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(ExportError::InvalidFilename(filename.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn write(&self, bytes: &[u8], filename: &str, mime: &str) -> Result<SavedArtifact> {
        let path = self.target(filename)?;
        write_atomic(&path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "saved export");
        Ok(SavedArtifact {
            filename: filename.to_string(),
            mime: mime.to_string(),
            bytes: bytes.len(),
            path: Some(path),
        })
    }
}

impl FileSink for DirectorySink {
    fn save_file(&self, content: &str, filename: &str, mime: &str) -> Result<SavedArtifact> {
        self.write(content.as_bytes(), filename, mime)
    }

    fn save_base64_file(&self, base64: &str, filename: &str, mime: &str) -> Result<SavedArtifact> {
        let bytes = STANDARD.decode(base64)?;
        self.write(&bytes, filename, mime)
    }

    fn save_zip(&self, entries: &[ZipEntry], filename: &str) -> Result<SavedArtifact> {
        let bytes = build_zip(entries)?;
        self.write(&bytes, filename, mime::ZIP)
    }
}

fn io_error(operation: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> ExportError {
    let path = path.to_path_buf();
    move |source| ExportError::Io {
        operation,
        path,
        source,
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error("create directory", parent))?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let mut file = File::create(&temp_path).map_err(io_error("create", &temp_path))?;
    let written = file
        .write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(io_error("write", &temp_path));
    drop(file);
    if let Err(error) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(error);
    }

    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        ExportError::Io {
            operation: "rename",
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Payload recorded by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryContent {
    Text(String),
    Base64(String),
    Zip(Vec<ZipEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryArtifact {
    pub filename: String,
    pub mime: String,
    pub content: MemoryContent,
}

/// Keeps artifacts in memory, in the order they were saved.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<MemoryArtifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> Vec<MemoryArtifact> {
        self.lock().clone()
    }

    pub fn get(&self, filename: &str) -> Option<MemoryArtifact> {
        self.lock()
            .iter()
            .rev()
            .find(|artifact| artifact.filename == filename)
            .cloned()
    }

    /// Text of a saved plain file.
    pub fn text(&self, filename: &str) -> Option<String> {
        match self.get(filename)?.content {
            MemoryContent::Text(text) => Some(text),
            MemoryContent::Base64(_) | MemoryContent::Zip(_) => None,
        }
    }

    /// Entries of a saved archive.
    pub fn zip_entries(&self, filename: &str) -> Option<Vec<ZipEntry>> {
        match self.get(filename)?.content {
            MemoryContent::Zip(entries) => Some(entries),
            MemoryContent::Text(_) | MemoryContent::Base64(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MemoryArtifact>> {
        self.artifacts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, filename: &str, mime: &str, content: MemoryContent, bytes: usize) -> SavedArtifact {
        self.lock().push(MemoryArtifact {
            filename: filename.to_string(),
            mime: mime.to_string(),
            content,
        });
        SavedArtifact {
            filename: filename.to_string(),
            mime: mime.to_string(),
            bytes,
            path: None,
        }
    }
}

impl FileSink for MemorySink {
    fn save_file(&self, content: &str, filename: &str, mime: &str) -> Result<SavedArtifact> {
        Ok(self.record(filename, mime, MemoryContent::Text(content.to_string()), content.len()))
    }

    fn save_base64_file(&self, base64: &str, filename: &str, mime: &str) -> Result<SavedArtifact> {
        let bytes = STANDARD.decode(base64)?.len();
        Ok(self.record(filename, mime, MemoryContent::Base64(base64.to_string()), bytes))
    }

    fn save_zip(&self, entries: &[ZipEntry], filename: &str) -> Result<SavedArtifact> {
        let bytes = entries.iter().map(|entry| entry.data.len()).sum();
        Ok(self.record(filename, mime::ZIP, MemoryContent::Zip(entries.to_vec()), bytes))
    }
}
