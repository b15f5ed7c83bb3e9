//! Export orchestration for clade analysis results.
//!
//! This crate connects analysis outcomes to output files:
//!
//! - [`AnalysisStore`] and [`ColumnConfigStore`] hold the shared,
//!   copy-on-write run state
//! - [`SerializationWorkerClient`] formats results on one background thread
//! - [`ExportOrchestrator`] runs the per-format exports and the combined zip
//! - [`FileSink`] implementations receive the finished artifacts
//! - [`ExportAction`], [`ExportRunState`] and [`ErrorSlot`] track progress
//!   and failures
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = Arc::new(ExportOrchestrator::new(analysis, columns, catalog, sink));
//! if let Some(action) = orchestrator.action(ExportKind::Csv, Some("sars-cov-2")) {
//!     action.trigger(&action.default_filename()).await?;
//! }
//! ```

pub mod action;
pub mod archive;
pub mod error;
pub mod error_slot;
pub mod kind;
pub mod orchestrator;
pub mod run_state;
pub mod sink;
pub mod store;
pub mod worker;

pub use action::ExportAction;
pub use archive::build_zip;
pub use error::{ExportError, Result};
pub use error_slot::ErrorSlot;
pub use kind::ExportKind;
pub use orchestrator::ExportOrchestrator;
pub use run_state::{ExportRunState, RunPhase};
pub use sink::{DirectorySink, FileSink, MemoryArtifact, MemoryContent, MemorySink, SavedArtifact};
pub use store::{AnalysisStore, ColumnConfigStore};
pub use worker::{FormatJob, ResultFormatter, SerializationWorkerClient, StandardFormatter, WorkerConfig};
