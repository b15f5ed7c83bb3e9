//! An export bound to its own run state.

use std::sync::Arc;

use crate::error::ExportError;
use crate::kind::ExportKind;
use crate::orchestrator::ExportOrchestrator;
use crate::run_state::ExportRunState;
use crate::sink::SavedArtifact;

/// One export button: a kind, an optional dataset and the state of its
/// most recent run.
#[derive(Debug, Clone)]
pub struct ExportAction {
    orchestrator: Arc<ExportOrchestrator>,
    kind: ExportKind,
    dataset: Option<String>,
    state: Arc<ExportRunState>,
}

impl ExportAction {
    pub fn new(orchestrator: Arc<ExportOrchestrator>, kind: ExportKind, dataset: Option<String>) -> Self {
        Self {
            orchestrator,
            kind,
            dataset,
            state: Arc::new(ExportRunState::new()),
        }
    }

    pub fn kind(&self) -> ExportKind {
        self.kind
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub fn state(&self) -> &Arc<ExportRunState> {
        &self.state
    }

    pub fn default_filename(&self) -> String {
        self.kind
            .default_filename(self.orchestrator.params())
            .to_string()
    }

    /// Run the export and record the outcome in the run state.
    ///
    /// A failure is reported to the orchestrator's error slot exactly once
    /// and returned to the caller as well.
    pub async fn trigger(&self, filename: &str) -> Result<SavedArtifact, Arc<ExportError>> {
        self.state.start();
        match self
            .orchestrator
            .export(self.kind, self.dataset.as_deref(), filename)
            .await
        {
            Ok(saved) => {
                self.state.succeed();
                Ok(saved)
            }
            Err(error) => Err(self.state.fail(error, self.orchestrator.error_slot())),
        }
    }
}
