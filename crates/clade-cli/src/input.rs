//! Reading analysis outcomes and dataset bundles from disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clade_model::{AnalysisOutcome, DatasetCatalog};
use tracing::debug;

/// Read outcomes from a JSON array or an NDJSON file.
pub fn read_outcomes(path: &Path) -> Result<Vec<AnalysisOutcome>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read outcomes {}", path.display()))?;
    let outcomes =
        parse_outcomes(&text).with_context(|| format!("parse outcomes {}", path.display()))?;
    debug!(path = %path.display(), count = outcomes.len(), "read outcomes");
    Ok(outcomes)
}

/// Parse outcomes in either wire layout.
///
/// Text starting with `[` is a JSON array; anything else is one outcome per
/// non-blank line.
pub fn parse_outcomes(text: &str) -> Result<Vec<AnalysisOutcome>> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).context("invalid outcome array");
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid outcome on line {}", number + 1))
        })
        .collect()
}

/// Read a JSON array of dataset bundles.
pub fn read_catalog(path: &Path) -> Result<DatasetCatalog> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read datasets {}", path.display()))?;
    DatasetCatalog::from_json(&text).with_context(|| format!("parse datasets {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: &str = r#"{"index":0,"seqName":"a","result":{"analysisResult":{"index":0,"seqName":"a","datasetName":"flu"},"query":"ACGT"}}"#;
    const FAILURE: &str = r#"{"index":1,"seqName":"b","error":"no seed matches"}"#;

    #[test]
    fn ndjson_skips_blank_lines() {
        let text = format!("{SUCCESS}\n\n{FAILURE}\n");
        let outcomes = parse_outcomes(&text).expect("parse");
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].seq_name(), "b");
    }

    #[test]
    fn array_layout_is_accepted() {
        let text = format!("  [{SUCCESS}, {FAILURE}]");
        let outcomes = parse_outcomes(&text).expect("parse");
        assert_eq!(outcomes[0].dataset_name(), Some("flu"));
        assert!(!outcomes[1].is_success());
    }

    #[test]
    fn bad_line_is_reported_by_number() {
        let both = r#"{"index":2,"seqName":"c","error":"x","result":{"analysisResult":{"index":2,"seqName":"c","datasetName":"flu"},"query":""}}"#;
        let error = parse_outcomes(&format!("{SUCCESS}\n{both}\n")).expect_err("malformed");
        assert_eq!(error.to_string(), "invalid outcome on line 2");
        assert!(format!("{error:#}").contains("both a result and an error"));
    }
}
