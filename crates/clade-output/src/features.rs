//! GFF3 and NCBI feature table writers for annotated query features.

use std::fmt::Write as _;

use clade_model::{AnalysisResult, FeatureAnnotation, Strand};

use crate::error::{FormatError, Result};

const GFF_SOURCE: &str = "clade-export";

/// Write annotated features as GFF3.
///
/// Returns an empty string when no result carries any feature, so callers
/// can skip the file entirely.
pub fn results_to_gff_string(results: &[AnalysisResult]) -> Result<String> {
    let sorted = sorted_with_features(results);
    if sorted.is_empty() {
        return Ok(String::new());
    }
    let mut out = String::from("##gff-version 3\n");
    for result in sorted {
        let seq_id = escape_gff(&result.seq_name);
        for feature in &result.annotation {
            check_range(result, feature)?;
            writeln!(
                out,
                "{seq_id}\t{GFF_SOURCE}\t{}\t{}\t{}\t.\t{}\t.\tName={}",
                escape_gff(&feature.feature_type),
                feature.start + 1,
                feature.end,
                feature.strand.as_str(),
                escape_gff(&feature.name),
            )
            .map_err(fmt_error)?;
        }
    }
    Ok(out)
}

/// Write annotated features as an NCBI feature table (`.tbl`).
///
/// Returns an empty string when no result carries any feature.
pub fn results_to_tbl_string(results: &[AnalysisResult]) -> Result<String> {
    let sorted = sorted_with_features(results);
    let mut out = String::new();
    for result in sorted {
        writeln!(out, ">Feature {}", result.seq_name).map_err(fmt_error)?;
        for feature in &result.annotation {
            check_range(result, feature)?;
            let (first, last) = match feature.strand {
                Strand::Reverse => (feature.end, feature.start + 1),
                Strand::Forward | Strand::Unknown => (feature.start + 1, feature.end),
            };
            writeln!(out, "{first}\t{last}\t{}", feature.feature_type).map_err(fmt_error)?;
            writeln!(out, "\t\t\tgene\t{}", feature.name).map_err(fmt_error)?;
        }
    }
    Ok(out)
}

fn sorted_with_features(results: &[AnalysisResult]) -> Vec<&AnalysisResult> {
    let mut sorted: Vec<&AnalysisResult> = results
        .iter()
        .filter(|result| !result.annotation.is_empty())
        .collect();
    sorted.sort_by_key(|result| result.index);
    sorted
}

fn check_range(result: &AnalysisResult, feature: &FeatureAnnotation) -> Result<()> {
    if feature.start >= feature.end {
        return Err(FormatError::Unsupported(format!(
            "feature '{}' of sequence '{}' has an empty range {}..{}",
            feature.name, result.seq_name, feature.start, feature.end
        )));
    }
    Ok(())
}

/// Percent-encode characters with special meaning in GFF3 columns.
fn escape_gff(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_control() || matches!(ch, '%' | ';' | '=' | '&' | ',') {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "%{byte:02X}");
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn fmt_error(error: std::fmt::Error) -> FormatError {
    FormatError::Unsupported(format!("failed to format output: {error}"))
}
