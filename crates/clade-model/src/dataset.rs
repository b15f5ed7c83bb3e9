//! Per-dataset auxiliary descriptors.
//!
//! These are pass-through payload for the formatters: the exporter never
//! interprets them beyond reading attribute names for dynamic columns.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::columns::CsvColumnConfig;
use crate::error::{ModelError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CladeNodeAttrDesc {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hide_in_web: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhenotypeAttrDesc {
    pub name: String,
    #[serde(default)]
    pub name_friendly: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AaMotifsDesc {
    pub name: String,
    #[serde(default)]
    pub name_short: String,
    #[serde(default)]
    pub name_friendly: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefNodeSearchDesc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl RefNodeSearchDesc {
    pub fn display_name_or_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Reference-node search descriptors; unknown fields pass through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefNodesDesc {
    #[serde(default)]
    pub search: Vec<RefNodeSearchDesc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Descriptors handed to the formatters alongside results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptors {
    #[serde(default)]
    pub clade_node_attrs: Vec<CladeNodeAttrDesc>,
    #[serde(default)]
    pub phenotype_attrs: Vec<PhenotypeAttrDesc>,
    #[serde(default)]
    pub ref_nodes: RefNodesDesc,
    #[serde(default)]
    pub aa_motifs: Vec<AaMotifsDesc>,
}

impl Descriptors {
    /// Merge descriptors of several datasets for an unscoped export.
    ///
    /// The first descriptor with a given name wins.
    pub fn merged<'a>(all: impl IntoIterator<Item = &'a Descriptors>) -> Descriptors {
        let mut merged = Descriptors::default();
        for descriptors in all {
            push_unique(
                &mut merged.clade_node_attrs,
                &descriptors.clade_node_attrs,
                |desc| &desc.name,
            );
            push_unique(
                &mut merged.phenotype_attrs,
                &descriptors.phenotype_attrs,
                |desc| &desc.name,
            );
            push_unique(&mut merged.aa_motifs, &descriptors.aa_motifs, |desc| {
                &desc.name
            });
            push_unique(
                &mut merged.ref_nodes.search,
                &descriptors.ref_nodes.search,
                |desc| &desc.name,
            );
            for (key, value) in &descriptors.ref_nodes.extra {
                merged
                    .ref_nodes
                    .extra
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        merged
    }

    pub fn clade_node_attr_keys(&self) -> Vec<String> {
        self.clade_node_attrs
            .iter()
            .map(|desc| desc.name.clone())
            .collect()
    }

    pub fn phenotype_attr_keys(&self) -> Vec<String> {
        self.phenotype_attrs
            .iter()
            .map(|desc| desc.name.clone())
            .collect()
    }
}

fn push_unique<T: Clone>(target: &mut Vec<T>, source: &[T], key: impl Fn(&T) -> &String) {
    for item in source {
        if !target.iter().any(|existing| key(existing) == key(item)) {
            target.push(item.clone());
        }
    }
}

/// A named dataset with its descriptors and optional artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetBundle {
    pub name: String,
    #[serde(default)]
    pub descriptors: Descriptors,
    /// Auspice tree JSON, when the dataset ships a reference tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_nwk: Option<String>,
    /// Genes annotated in the reference; empty means no peptides.
    #[serde(default)]
    pub genes: Vec<String>,
    /// Column layout the dataset recommends for tabular exports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<CsvColumnConfig>,
}

impl DatasetBundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptors: Descriptors::default(),
            tree: None,
            tree_nwk: None,
            genes: Vec::new(),
            columns: None,
        }
    }

    pub fn has_tree(&self) -> bool {
        self.tree.is_some()
    }

    pub fn has_tree_nwk(&self) -> bool {
        self.tree_nwk.as_deref().is_some_and(|nwk| !nwk.is_empty())
    }

    pub fn has_peptides(&self) -> bool {
        !self.genes.is_empty()
    }
}

/// Datasets of one run, keyed by name in load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetCatalog {
    datasets: IndexMap<String, DatasetBundle>,
}

impl DatasetCatalog {
    /// Build a catalog, rejecting empty or duplicate dataset names.
    pub fn new(bundles: impl IntoIterator<Item = DatasetBundle>) -> Result<Self> {
        let mut datasets = IndexMap::new();
        for bundle in bundles {
            if bundle.name.trim().is_empty() {
                return Err(ModelError::EmptyDatasetName);
            }
            if datasets.contains_key(&bundle.name) {
                return Err(ModelError::DuplicateDataset(bundle.name));
            }
            datasets.insert(bundle.name.clone(), bundle);
        }
        debug!(count = datasets.len(), "loaded dataset catalog");
        Ok(Self { datasets })
    }

    /// Parse a JSON array of dataset bundles.
    pub fn from_json(json: &str) -> Result<Self> {
        let bundles: Vec<DatasetBundle> = serde_json::from_str(json)?;
        Self::new(bundles)
    }

    pub fn get(&self, name: &str) -> Option<&DatasetBundle> {
        self.datasets.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&DatasetBundle> {
        self.get(name)
            .ok_or_else(|| ModelError::UnknownDataset(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetBundle> {
        self.datasets.values()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Column configuration to start a run with.
    ///
    /// The first dataset that ships a layout provides it; otherwise every
    /// default column is enabled.
    pub fn column_defaults(&self) -> CsvColumnConfig {
        match self.datasets.values().find_map(|bundle| bundle.columns.as_ref()) {
            Some(columns) => {
                debug!(categories = columns.categories().len(), "using dataset column layout");
                columns.clone()
            }
            None => CsvColumnConfig::default(),
        }
    }

    /// Descriptors of every dataset merged for run-wide exports.
    pub fn merged_descriptors(&self) -> Descriptors {
        Descriptors::merged(self.datasets.values().map(|bundle| &bundle.descriptors))
    }
}
