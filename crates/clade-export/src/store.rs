//! Shared, copy-on-write state read by exports.
//!
//! Readers take an `Arc` snapshot and never observe a half-applied update.
//! Writers replace the whole value through a `watch` channel.

use std::cmp::Ordering;
use std::sync::Arc;

use clade_model::{AnalysisOutcome, CsvColumnConfig};
use tokio::sync::watch;
use tracing::debug;

/// Outcomes of the current run, in the order they completed.
///
/// Display order is kept separately and never changes what exports see.
#[derive(Debug)]
pub struct AnalysisStore {
    outcomes: watch::Sender<Arc<Vec<AnalysisOutcome>>>,
    display: watch::Sender<Arc<Vec<usize>>>,
}

impl Default for AnalysisStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisStore {
    pub fn new() -> Self {
        let (outcomes, _) = watch::channel(Arc::new(Vec::new()));
        let (display, _) = watch::channel(Arc::new(Vec::new()));
        Self { outcomes, display }
    }

    pub fn push(&self, outcome: AnalysisOutcome) {
        self.extend([outcome]);
    }

    pub fn extend(&self, outcomes: impl IntoIterator<Item = AnalysisOutcome>) {
        // Display positions are appended under the outcomes lock.
        self.outcomes.send_if_modified(|current| {
            let start = current.len();
            let all = Arc::make_mut(current);
            all.extend(outcomes);
            let total = all.len();
            if total == start {
                return false;
            }
            self.display
                .send_modify(|order| Arc::make_mut(order).extend(start..total));
            debug!(added = total - start, total, "stored analysis outcomes");
            true
        });
    }

    /// Point-in-time view of all outcomes, in completion order.
    pub fn snapshot(&self) -> Arc<Vec<AnalysisOutcome>> {
        Arc::clone(&self.outcomes.borrow())
    }

    pub fn len(&self) -> usize {
        self.outcomes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<AnalysisOutcome>>> {
        self.outcomes.subscribe()
    }

    /// Reorder outcomes for display only.
    pub fn sort_display_by(&self, mut compare: impl FnMut(&AnalysisOutcome, &AnalysisOutcome) -> Ordering) {
        let outcomes = self.outcomes.borrow();
        let mut order: Vec<usize> = (0..outcomes.len()).collect();
        order.sort_by(|&a, &b| compare(&outcomes[a], &outcomes[b]));
        self.display.send_replace(Arc::new(order));
    }

    /// Outcomes in the current display order.
    pub fn displayed(&self) -> Vec<AnalysisOutcome> {
        let outcomes = self.outcomes.borrow();
        let order = self.display.borrow();
        order
            .iter()
            .filter_map(|&position| outcomes.get(position).cloned())
            .collect()
    }
}

/// The current column selection, replaced wholesale on every change.
#[derive(Debug)]
pub struct ColumnConfigStore {
    current: watch::Sender<Option<Arc<CsvColumnConfig>>>,
}

impl Default for ColumnConfigStore {
    fn default() -> Self {
        Self::new(Some(CsvColumnConfig::default()))
    }
}

impl ColumnConfigStore {
    pub fn new(config: Option<CsvColumnConfig>) -> Self {
        let (current, _) = watch::channel(config.map(Arc::new));
        Self { current }
    }

    /// A store that has not been initialized yet.
    pub fn empty() -> Self {
        Self::new(None)
    }

    pub fn current(&self) -> Option<Arc<CsvColumnConfig>> {
        self.current.borrow().clone()
    }

    pub fn set(&self, config: CsvColumnConfig) {
        self.current.send_replace(Some(Arc::new(config)));
    }

    /// Replace the configuration with `update(current)`.
    ///
    /// `update` runs under the store's lock, so concurrent updates apply one
    /// after another. Subscribers are only notified when the value changed.
    /// Returns `false` and leaves the store untouched when it is empty.
    pub fn update(&self, update: impl FnOnce(&CsvColumnConfig) -> CsvColumnConfig) -> bool {
        let mut initialized = false;
        self.current.send_if_modified(|slot| {
            let Some(current) = slot.as_ref() else {
                return false;
            };
            initialized = true;
            let next = update(current);
            if next == **current {
                return false;
            }
            *slot = Some(Arc::new(next));
            true
        });
        initialized
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CsvColumnConfig>>> {
        self.current.subscribe()
    }
}
