//! Per-sequence analysis outcomes produced by the analysis engine.
//!
//! An outcome is either a success carrying the full analysis result, or a
//! failure carrying an error message. The engine's wire form encodes this as
//! two optional fields; [`AnalysisOutcome`] converts from that form and
//! rejects records where both or neither are present.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ModelError;

/// Strand of an annotated feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
    #[default]
    #[serde(rename = ".")]
    Unknown,
}

impl Strand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "+",
            Self::Reverse => "-",
            Self::Unknown => ".",
        }
    }
}

/// A feature annotated on the query sequence.
///
/// Coordinates are zero-based, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAnnotation {
    pub feature_type: String,
    pub name: String,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub strand: Strand,
}

/// Analysis result for one sequence.
///
/// Only the fields the exporter needs are typed. Everything else the engine
/// reports (mutations, QC, coverage, ...) is kept in `payload` in its
/// original order and passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub index: usize,
    pub seq_name: String,
    pub dataset_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clade: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotation: Vec<FeatureAnnotation>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl AnalysisResult {
    pub fn new(index: usize, seq_name: impl Into<String>, dataset_name: impl Into<String>) -> Self {
        Self {
            index,
            seq_name: seq_name.into(),
            dataset_name: dataset_name.into(),
            clade: None,
            annotation: Vec::new(),
            payload: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneTranslation {
    pub name: String,
    pub seq: String,
}

/// Translated peptides of one sequence, keyed by gene name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(default)]
    pub genes: IndexMap<String, GeneTranslation>,
}

impl Translation {
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessOutcome {
    pub index: usize,
    pub seq_name: String,
    pub analysis_result: AnalysisResult,
    /// Aligned query sequence.
    pub query: String,
    pub translation: Translation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureOutcome {
    pub index: usize,
    pub seq_name: String,
    pub error: String,
    /// Dataset suggested for the sequence before analysis failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
}

/// Outcome of analyzing one sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOutcome", into = "RawOutcome")]
pub enum AnalysisOutcome {
    Success(Box<SuccessOutcome>),
    Failure(FailureOutcome),
}

impl AnalysisOutcome {
    pub fn success(outcome: SuccessOutcome) -> Self {
        Self::Success(Box::new(outcome))
    }

    pub fn failure(outcome: FailureOutcome) -> Self {
        Self::Failure(outcome)
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Success(success) => success.index,
            Self::Failure(failure) => failure.index,
        }
    }

    pub fn seq_name(&self) -> &str {
        match self {
            Self::Success(success) => &success.seq_name,
            Self::Failure(failure) => &failure.seq_name,
        }
    }

    /// Dataset the outcome belongs to: the classified dataset for successes,
    /// the suggested one (if any) for failures.
    pub fn dataset_name(&self) -> Option<&str> {
        match self {
            Self::Success(success) => Some(success.analysis_result.dataset_name.as_str()),
            Self::Failure(failure) => failure.dataset_name.as_deref(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn as_success(&self) -> Option<&SuccessOutcome> {
        match self {
            Self::Success(success) => Some(success),
            Self::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&FailureOutcome> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

/// Success payload in the engine's wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSuccess {
    pub analysis_result: AnalysisResult,
    pub query: String,
    #[serde(default)]
    pub translation: Translation,
}

/// Outcome in the engine's wire form: exactly one of `result` and `error`
/// must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOutcome {
    pub index: usize,
    pub seq_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RawSuccess>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
}

impl TryFrom<RawOutcome> for AnalysisOutcome {
    type Error = ModelError;

    fn try_from(raw: RawOutcome) -> Result<Self, Self::Error> {
        let RawOutcome {
            index,
            seq_name,
            result,
            error,
            dataset_name,
        } = raw;
        match (result, error) {
            (Some(result), None) => Ok(Self::success(SuccessOutcome {
                index,
                seq_name,
                analysis_result: result.analysis_result,
                query: result.query,
                translation: result.translation,
            })),
            (None, Some(error)) => Ok(Self::Failure(FailureOutcome {
                index,
                seq_name,
                error,
                dataset_name,
            })),
            (Some(_), Some(_)) => Err(ModelError::MalformedOutcome {
                index,
                seq_name,
                reason: "has both a result and an error",
            }),
            (None, None) => Err(ModelError::MalformedOutcome {
                index,
                seq_name,
                reason: "has neither a result nor an error",
            }),
        }
    }
}

impl From<AnalysisOutcome> for RawOutcome {
    fn from(outcome: AnalysisOutcome) -> Self {
        match outcome {
            AnalysisOutcome::Success(success) => {
                let SuccessOutcome {
                    index,
                    seq_name,
                    analysis_result,
                    query,
                    translation,
                } = *success;
                Self {
                    index,
                    seq_name,
                    result: Some(RawSuccess {
                        analysis_result,
                        query,
                        translation,
                    }),
                    error: None,
                    dataset_name: None,
                }
            }
            AnalysisOutcome::Failure(failure) => Self {
                index: failure.index,
                seq_name: failure.seq_name,
                result: None,
                error: Some(failure.error),
                dataset_name: failure.dataset_name,
            },
        }
    }
}
