//! Process-wide "last error" surface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use tokio::sync::watch;
use tracing::error;

use crate::error::ExportError;

static GLOBAL: LazyLock<Arc<ErrorSlot>> = LazyLock::new(|| Arc::new(ErrorSlot::new()));

/// Holds the most recent export failure. Each report overwrites the last.
#[derive(Debug)]
pub struct ErrorSlot {
    last: watch::Sender<Option<Arc<ExportError>>>,
    reports: AtomicUsize,
}

impl Default for ErrorSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorSlot {
    pub fn new() -> Self {
        let (last, _) = watch::channel(None);
        Self {
            last,
            reports: AtomicUsize::new(0),
        }
    }

    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    pub fn report(&self, failure: ExportError) -> Arc<ExportError> {
        error!(internal = failure.is_internal(), error = %failure, "export failed");
        let failure = Arc::new(failure);
        self.reports.fetch_add(1, Ordering::SeqCst);
        self.last.send_replace(Some(Arc::clone(&failure)));
        failure
    }

    pub fn last(&self) -> Option<Arc<ExportError>> {
        self.last.borrow().clone()
    }

    /// Number of failures reported since creation.
    pub fn report_count(&self) -> usize {
        self.reports.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.last.send_replace(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ExportError>>> {
        self.last.subscribe()
    }
}
