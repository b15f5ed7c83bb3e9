//! JSON and NDJSON writers.

use chrono::{SecondsFormat, Utc};
use clade_model::{AnalysisResult, CladeNodeAttrDesc, Descriptors, FailureOutcome, PhenotypeAttrDesc};
use serde::Serialize;

use crate::error::Result;

pub const RESULTS_JSON_SCHEMA_VERSION: &str = "3.0.0";

/// Error entry as written to JSON and NDJSON outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub index: usize,
    pub seq_name: String,
    pub errors: Vec<String>,
}

impl From<&FailureOutcome> for ErrorRecord {
    fn from(failure: &FailureOutcome) -> Self {
        Self {
            index: failure.index,
            seq_name: failure.seq_name.clone(),
            errors: vec![failure.error.clone()],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsJson<'a> {
    pub schema_version: &'static str,
    pub clade_export_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<&'a str>,
    pub created_at: String,
    pub clade_node_attr_keys: &'a [CladeNodeAttrDesc],
    pub phenotype_attr_keys: &'a [PhenotypeAttrDesc],
    pub results: Vec<&'a AnalysisResult>,
    pub errors: Vec<ErrorRecord>,
}

impl<'a> ResultsJson<'a> {
    pub fn new(
        results: &'a [AnalysisResult],
        errors: &[FailureOutcome],
        descriptors: &'a Descriptors,
        app_version: Option<&'a str>,
        created_at: String,
    ) -> Self {
        let mut results: Vec<&AnalysisResult> = results.iter().collect();
        results.sort_by_key(|result| result.index);
        let mut errors: Vec<ErrorRecord> = errors.iter().map(ErrorRecord::from).collect();
        errors.sort_by_key(|error| error.index);
        Self {
            schema_version: RESULTS_JSON_SCHEMA_VERSION,
            clade_export_version: env!("CARGO_PKG_VERSION"),
            app_version,
            created_at,
            clade_node_attr_keys: &descriptors.clade_node_attrs,
            phenotype_attr_keys: &descriptors.phenotype_attrs,
            results,
            errors,
        }
    }
}

pub fn results_to_json_string(
    results: &[AnalysisResult],
    errors: &[FailureOutcome],
    descriptors: &Descriptors,
    app_version: Option<&str>,
) -> Result<String> {
    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let document = ResultsJson::new(results, errors, descriptors, app_version, created_at);
    Ok(serde_json::to_string(&document)?)
}

/// One JSON object per line, results and errors merged by `index`.
pub fn results_to_ndjson_string(
    results: &[AnalysisResult],
    errors: &[FailureOutcome],
) -> Result<String> {
    let mut lines: Vec<(usize, String)> = Vec::with_capacity(results.len() + errors.len());
    for result in results {
        lines.push((result.index, serde_json::to_string(result)?));
    }
    for error in errors {
        lines.push((error.index, serde_json::to_string(&ErrorRecord::from(error))?));
    }
    lines.sort_by_key(|(index, _)| *index);

    let mut out = String::new();
    for (_, line) in lines {
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}
