//! The export formats offered for a run.

use std::fmt;
use std::str::FromStr;

use clade_model::{ExportParams, mime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportKind {
    Csv,
    Tsv,
    Json,
    Ndjson,
    Fasta,
    Peptides,
    Tree,
    TreeNwk,
    Gff,
    Tbl,
    Excel,
    Unclassified,
    Zip,
}

impl ExportKind {
    pub const ALL: [ExportKind; 13] = [
        Self::Csv,
        Self::Tsv,
        Self::Json,
        Self::Ndjson,
        Self::Fasta,
        Self::Peptides,
        Self::Tree,
        Self::TreeNwk,
        Self::Gff,
        Self::Tbl,
        Self::Excel,
        Self::Unclassified,
        Self::Zip,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Fasta => "fasta",
            Self::Peptides => "peptides",
            Self::Tree => "tree",
            Self::TreeNwk => "tree-nwk",
            Self::Gff => "gff",
            Self::Tbl => "tbl",
            Self::Excel => "excel",
            Self::Unclassified => "unclassified",
            Self::Zip => "zip",
        }
    }

    /// Per-dataset exports need a dataset name; the others cover the whole run.
    pub fn is_dataset_scoped(self) -> bool {
        !matches!(self, Self::Excel | Self::Unclassified | Self::Zip)
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Csv => mime::CSV,
            Self::Tsv | Self::Unclassified => mime::TSV,
            Self::Json | Self::Tree => mime::JSON,
            Self::Ndjson => mime::NDJSON,
            Self::Fasta => mime::FASTA,
            Self::Peptides | Self::Zip => mime::ZIP,
            Self::TreeNwk => mime::NEWICK,
            Self::Gff => mime::GFF,
            Self::Tbl => mime::TBL,
            Self::Excel => mime::EXCEL,
        }
    }

    pub fn default_filename(self, params: &ExportParams) -> &str {
        match self {
            Self::Csv => &params.filename_csv,
            Self::Tsv => &params.filename_tsv,
            Self::Json => &params.filename_json,
            Self::Ndjson => &params.filename_ndjson,
            Self::Fasta => &params.filename_fasta,
            Self::Peptides => &params.filename_peptides_zip,
            Self::Tree => &params.filename_tree,
            Self::TreeNwk => &params.filename_tree_nwk,
            Self::Gff => &params.filename_gff,
            Self::Tbl => &params.filename_tbl,
            Self::Excel => &params.filename_excel,
            Self::Unclassified => &params.filename_unclassified,
            Self::Zip => &params.filename_zip,
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|kind| kind.as_str()).collect();
                format!("unknown export format '{value}' (expected one of: {})", known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in ExportKind::ALL {
            assert_eq!(kind.as_str().parse::<ExportKind>(), Ok(kind));
        }
        assert!("xlsx".parse::<ExportKind>().is_err());
    }

    #[test]
    fn run_wide_kinds() {
        let run_wide: Vec<_> = ExportKind::ALL
            .into_iter()
            .filter(|kind| !kind.is_dataset_scoped())
            .collect();
        assert_eq!(run_wide, [ExportKind::Excel, ExportKind::Unclassified, ExportKind::Zip]);
    }
}
