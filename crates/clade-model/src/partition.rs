//! Splitting outcomes into successes and failures and by dataset.
//!
//! Every function returns outcomes in ascending `index` order, whatever
//! order the input was in. Display sorting happens elsewhere and must never
//! leak into exported row order.

use crate::outcome::{AnalysisOutcome, FailureOutcome, SuccessOutcome};

/// Outcomes split by kind, each bucket ordered by `index`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partitioned {
    pub successes: Vec<SuccessOutcome>,
    pub failures: Vec<FailureOutcome>,
}

impl Partitioned {
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }
}

pub fn partition_by_outcome(outcomes: &[AnalysisOutcome]) -> Partitioned {
    let mut partitioned = Partitioned::default();
    for outcome in sorted_by_index(outcomes) {
        match outcome {
            AnalysisOutcome::Success(success) => partitioned.successes.push((**success).clone()),
            AnalysisOutcome::Failure(failure) => partitioned.failures.push(failure.clone()),
        }
    }
    partitioned
}

/// Outcomes belonging to `dataset_name`: successes classified into it and
/// failures for which it was suggested.
pub fn partition_by_dataset(outcomes: &[AnalysisOutcome], dataset_name: &str) -> Vec<AnalysisOutcome> {
    sorted_by_index(outcomes)
        .into_iter()
        .filter(|outcome| outcome.dataset_name() == Some(dataset_name))
        .cloned()
        .collect()
}

/// Failures that were never assigned a dataset.
pub fn outcomes_without_dataset_suggestion(outcomes: &[AnalysisOutcome]) -> Vec<FailureOutcome> {
    sorted_by_index(outcomes)
        .into_iter()
        .filter_map(AnalysisOutcome::as_failure)
        .filter(|failure| failure.dataset_name.is_none())
        .cloned()
        .collect()
}

pub fn map_successes<T>(outcomes: &[AnalysisOutcome], f: impl FnMut(&SuccessOutcome) -> T) -> Vec<T> {
    sorted_by_index(outcomes)
        .into_iter()
        .filter_map(AnalysisOutcome::as_success)
        .map(f)
        .collect()
}

pub fn map_failures<T>(outcomes: &[AnalysisOutcome], f: impl FnMut(&FailureOutcome) -> T) -> Vec<T> {
    sorted_by_index(outcomes)
        .into_iter()
        .filter_map(AnalysisOutcome::as_failure)
        .map(f)
        .collect()
}

/// Distinct dataset names in order of first appearance by `index`.
pub fn dataset_names(outcomes: &[AnalysisOutcome]) -> Vec<String> {
    let mut names = Vec::<String>::new();
    for outcome in sorted_by_index(outcomes) {
        if let Some(name) = outcome.dataset_name()
            && !names.iter().any(|known| known == name)
        {
            names.push(name.to_string());
        }
    }
    names
}

fn sorted_by_index(outcomes: &[AnalysisOutcome]) -> Vec<&AnalysisOutcome> {
    let mut sorted: Vec<&AnalysisOutcome> = outcomes.iter().collect();
    sorted.sort_by_key(|outcome| outcome.index());
    sorted
}
