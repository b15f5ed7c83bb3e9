//! Column layout and row extraction shared by CSV, TSV and Excel.

use clade_model::{AnalysisResult, CsvColumnConfig, Descriptors, FailureOutcome};
use serde_json::Value;

use crate::error::Result;
use crate::value::{Cell, lookup_path};

/// Where a column's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    /// A (possibly dotted) field of the analysis result.
    Field(String),
    CustomNodeAttr(String),
    Phenotype(String),
    AaMotif(String),
    FounderMuts { attr: String, field: &'static str },
    RelativeMuts { node: String, field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub header: String,
    pub source: ColumnSource,
}

impl Column {
    fn field(name: &str) -> Self {
        Self {
            header: name.to_string(),
            source: ColumnSource::Field(name.to_string()),
        }
    }
}

const MUTATION_FIELDS: [&str; 5] = [
    "nodeName",
    "substitutions",
    "deletions",
    "aaSubstitutions",
    "aaDeletions",
];

/// Build the ordered column list for a configuration.
///
/// Enabled columns come first in display order. Dynamic columns follow
/// `clade`; founder and relative mutation columns follow `missing`. When an
/// anchor column is not enabled the group is appended at the end.
pub fn prepare_columns(descriptors: &Descriptors, config: &CsvColumnConfig) -> Vec<Column> {
    let mut columns: Vec<Column> = config
        .enabled_columns()
        .into_iter()
        .map(Column::field)
        .collect();

    if config.include_dynamic() {
        let dynamic = descriptors
            .clade_node_attrs
            .iter()
            .map(|desc| Column {
                header: desc.name.clone(),
                source: ColumnSource::CustomNodeAttr(desc.name.clone()),
            })
            .chain(descriptors.phenotype_attrs.iter().map(|desc| Column {
                header: desc.name.clone(),
                source: ColumnSource::Phenotype(desc.name.clone()),
            }))
            .chain(descriptors.aa_motifs.iter().map(|desc| Column {
                header: desc.name.clone(),
                source: ColumnSource::AaMotif(desc.name.clone()),
            }))
            .collect();
        insert_after_header(&mut columns, "clade", dynamic);
    }

    let mut mutation_columns = Vec::new();
    if config.include_clade_founder_muts() {
        let attrs = std::iter::once("clade".to_string())
            .chain(descriptors.clade_node_attr_keys());
        for attr in attrs {
            for field in MUTATION_FIELDS {
                mutation_columns.push(Column {
                    header: format!("founderMuts['{attr}'].{field}"),
                    source: ColumnSource::FounderMuts {
                        attr: attr.clone(),
                        field,
                    },
                });
            }
        }
    }
    if config.include_rel_muts() {
        for node in &descriptors.ref_nodes.search {
            let name = node.display_name_or_name();
            for field in MUTATION_FIELDS {
                mutation_columns.push(Column {
                    header: format!("relativeMutations['{name}'].{field}"),
                    source: ColumnSource::RelativeMuts {
                        node: name.to_string(),
                        field,
                    },
                });
            }
        }
    }
    insert_after_header(&mut columns, "missing", mutation_columns);

    columns
}

fn insert_after_header(columns: &mut Vec<Column>, anchor: &str, group: Vec<Column>) {
    let at = columns
        .iter()
        .position(|column| column.header == anchor)
        .map_or(columns.len(), |position| position + 1);
    columns.splice(at..at, group);
}

pub fn header_row(columns: &[Column]) -> Vec<String> {
    columns.iter().map(|column| column.header.clone()).collect()
}

/// One row per result and per error, merged in ascending `index` order.
pub fn build_rows(
    results: &[AnalysisResult],
    errors: &[FailureOutcome],
    columns: &[Column],
) -> Result<Vec<Vec<Cell>>> {
    let mut rows: Vec<(usize, Vec<Cell>)> = Vec::with_capacity(results.len() + errors.len());
    for result in results {
        let json = serde_json::to_value(result)?;
        rows.push((result.index, result_row(result, &json, columns)));
    }
    for error in errors {
        rows.push((error.index, error_row(error, columns)));
    }
    rows.sort_by_key(|(index, _)| *index);
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}

fn result_row(result: &AnalysisResult, json: &Value, columns: &[Column]) -> Vec<Cell> {
    columns
        .iter()
        .map(|column| match &column.source {
            ColumnSource::Field(name) if name == "index" => Cell::Number(result.index.to_string()),
            ColumnSource::Field(name) if name == "seqName" => Cell::text(&result.seq_name),
            ColumnSource::Field(name) => Cell::from_json(lookup_path(json, name)),
            ColumnSource::CustomNodeAttr(key) => Cell::from_json(
                json.get("customNodeAttributes")
                    .and_then(|attrs| attrs.get(key)),
            ),
            ColumnSource::Phenotype(name) => Cell::from_json(phenotype_value(json, name)),
            ColumnSource::AaMotif(name) => {
                Cell::from_json(json.get("aaMotifs").and_then(|motifs| motifs.get(name)))
            }
            ColumnSource::FounderMuts { attr, field } => Cell::from_json(
                json.get("founderMuts")
                    .and_then(|founders| founders.get(attr))
                    .and_then(|founder| founder.get(*field)),
            ),
            ColumnSource::RelativeMuts { node, field } => Cell::from_json(
                json.get("relativeMutations")
                    .and_then(|relatives| relatives.get(node))
                    .and_then(|relative| relative.get(*field)),
            ),
        })
        .collect()
}

fn phenotype_value<'a>(json: &'a Value, name: &str) -> Option<&'a Value> {
    json.get("phenotypeValues")?
        .as_array()?
        .iter()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|entry| entry.get("value"))
}

fn error_row(error: &FailureOutcome, columns: &[Column]) -> Vec<Cell> {
    columns
        .iter()
        .map(|column| match &column.source {
            ColumnSource::Field(name) => match name.as_str() {
                "index" => Cell::Number(error.index.to_string()),
                "seqName" => Cell::text(&error.seq_name),
                "errors" => Cell::text(&error.error),
                _ => Cell::Empty,
            },
            _ => Cell::Empty,
        })
        .collect()
}

/// Render a row of cells as plain strings.
pub fn row_strings(row: &[Cell]) -> Vec<&str> {
    row.iter().map(Cell::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clade_model::{CladeNodeAttrDesc, PhenotypeAttrDesc, RefNodeSearchDesc};
    use clade_model::ColumnFlag;
    use clade_model::selection::{enable_all_categories, enable_column, set_flag};

    fn descriptors() -> Descriptors {
        let mut descriptors = Descriptors::default();
        descriptors.clade_node_attrs.push(CladeNodeAttrDesc {
            name: "Nextclade_pango".to_string(),
            display_name: "Pango lineage".to_string(),
            description: String::new(),
            hide_in_web: false,
        });
        descriptors.phenotype_attrs.push(PhenotypeAttrDesc {
            name: "immune_escape".to_string(),
            name_friendly: "Immune escape".to_string(),
            description: String::new(),
        });
        descriptors.ref_nodes.search.push(RefNodeSearchDesc {
            name: "ref".to_string(),
            display_name: Some("Reference".to_string()),
        });
        descriptors
    }

    fn minimal_config() -> CsvColumnConfig {
        let config = enable_all_categories(&CsvColumnConfig::default(), false);
        let config = enable_column(&config, "general", "index", true);
        let config = enable_column(&config, "general", "seqName", true);
        let config = enable_column(&config, "general", "clade", true);
        enable_column(&config, "qc", "missing", true)
    }

    #[test]
    fn dynamic_and_mutation_columns_follow_their_anchors() {
        let headers = header_row(&prepare_columns(&descriptors(), &minimal_config()));
        assert_eq!(
            headers,
            vec![
                "index",
                "seqName",
                "clade",
                "Nextclade_pango",
                "immune_escape",
                "missing",
                "founderMuts['clade'].nodeName",
                "founderMuts['clade'].substitutions",
                "founderMuts['clade'].deletions",
                "founderMuts['clade'].aaSubstitutions",
                "founderMuts['clade'].aaDeletions",
                "founderMuts['Nextclade_pango'].nodeName",
                "founderMuts['Nextclade_pango'].substitutions",
                "founderMuts['Nextclade_pango'].deletions",
                "founderMuts['Nextclade_pango'].aaSubstitutions",
                "founderMuts['Nextclade_pango'].aaDeletions",
                "relativeMutations['Reference'].nodeName",
                "relativeMutations['Reference'].substitutions",
                "relativeMutations['Reference'].deletions",
                "relativeMutations['Reference'].aaSubstitutions",
                "relativeMutations['Reference'].aaDeletions",
            ]
        );
    }

    #[test]
    fn duplicate_columns_appear_once() {
        let headers = header_row(&prepare_columns(&Descriptors::default(), &CsvColumnConfig::default()));
        let overall = headers.iter().filter(|h| *h == "qc.overallStatus").count();
        assert_eq!(overall, 1);
    }

    #[test]
    fn error_rows_fill_identity_and_errors_only() {
        let config = enable_column(&minimal_config(), "errs-warns", "errors", true);
        let config = set_flag(&config, ColumnFlag::CladeFounderMuts, false);
        let columns = prepare_columns(&Descriptors::default(), &config);
        let error = FailureOutcome {
            index: 4,
            seq_name: "bad".to_string(),
            error: "no seed matches".to_string(),
            dataset_name: None,
        };
        let rows = build_rows(&[], &[error], &columns).expect("rows");
        assert_eq!(
            row_strings(&rows[0]),
            vec!["4", "bad", "", "", "no seed matches"]
        );
    }
}
