//! Output filenames and archive entries.

use serde::{Deserialize, Serialize};

pub const GENE_PLACEHOLDER: &str = "{{gene}}";

/// Output filenames, one per supported format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportParams {
    pub filename_csv: String,
    pub filename_tsv: String,
    pub filename_json: String,
    pub filename_ndjson: String,
    pub filename_tree: String,
    pub filename_tree_nwk: String,
    pub filename_fasta: String,
    pub filename_peptides_zip: String,
    /// Per-gene peptide file name; `{{gene}}` is replaced by the gene name.
    pub filename_peptides_template: String,
    pub filename_gff: String,
    pub filename_tbl: String,
    pub filename_excel: String,
    pub filename_unclassified: String,
    pub filename_zip: String,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            filename_csv: "nextclade.csv".to_string(),
            filename_tsv: "nextclade.tsv".to_string(),
            filename_json: "nextclade.json".to_string(),
            filename_ndjson: "nextclade.ndjson".to_string(),
            filename_tree: "nextclade.auspice.json".to_string(),
            filename_tree_nwk: "nextclade.nwk".to_string(),
            filename_fasta: "nextclade.aligned.fasta".to_string(),
            filename_peptides_zip: "nextclade.peptides.fasta.zip".to_string(),
            filename_peptides_template: format!("nextclade.peptide.{GENE_PLACEHOLDER}.fasta"),
            filename_gff: "nextclade.gff".to_string(),
            filename_tbl: "nextclade.tbl".to_string(),
            filename_excel: "nextclade.xlsx".to_string(),
            filename_unclassified: "nextclade.unclassified.tsv".to_string(),
            filename_zip: "nextclade.zip".to_string(),
        }
    }
}

impl ExportParams {
    pub fn peptide_filename(&self, gene: &str) -> String {
        self.filename_peptides_template
            .replace(GENE_PLACEHOLDER, gene)
    }
}

/// MIME types of the produced files.
pub mod mime {
    pub const CSV: &str = "text/csv;charset=utf-8";
    pub const TSV: &str = "text/tab-separated-values;charset=utf-8";
    pub const JSON: &str = "application/json;charset=utf-8";
    pub const NDJSON: &str = "application/x-ndjson;charset=utf-8";
    pub const FASTA: &str = "application/x-fasta;charset=utf-8";
    pub const GFF: &str = "text/x-gff3;charset=utf-8";
    pub const TBL: &str = "text/x-tbl;charset=utf-8";
    pub const NEWICK: &str = "text/x-nh;charset=utf-8";
    pub const EXCEL: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
    pub const ZIP: &str = "application/zip";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZipData {
    Text(String),
    Bytes(Vec<u8>),
}

impl ZipData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    fn append(&mut self, other: ZipData) {
        match (self, other) {
            (Self::Text(text), Self::Text(more)) => text.push_str(&more),
            (this, other) => {
                let mut bytes = std::mem::replace(this, Self::Bytes(Vec::new()))
                    .into_bytes();
                bytes.extend_from_slice(other.as_bytes());
                *this = Self::Bytes(bytes);
            }
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    pub filename: String,
    pub data: ZipData,
}

impl ZipEntry {
    pub fn text(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            data: ZipData::Text(text.into()),
        }
    }

    pub fn bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data: ZipData::Bytes(bytes),
        }
    }
}

/// Archive entries with unique filenames.
///
/// Pushing an entry whose filename is already present appends its data to
/// the existing entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZipEntries {
    entries: Vec<ZipEntry>,
}

impl ZipEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ZipEntry) {
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.filename == entry.filename)
        {
            Some(existing) => existing.data.append(entry.data),
            None => self.entries.push(entry),
        }
    }

    pub fn push_text(&mut self, filename: impl Into<String>, text: impl Into<String>) {
        self.push(ZipEntry::text(filename, text));
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ZipEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn get(&self, filename: &str) -> Option<&ZipEntry> {
        self.entries.iter().find(|entry| entry.filename == filename)
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.filename.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZipEntry> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<ZipEntry> {
        self.entries
    }
}
