//! Column selection configuration for CSV, TSV and Excel exports.
//!
//! Columns are grouped into categories; both levels keep insertion order,
//! which is the order columns appear in exported files. Three flags switch
//! optional column groups that are not organized under categories.

use std::fmt;
use std::marker::PhantomData;
use std::sync::LazyLock;

use indexmap::IndexMap;
use rapidfuzz::distance::jaro_winkler;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{ModelError, Result};

/// Category name → column name → enabled.
pub type ColumnCategories = IndexMap<String, IndexMap<String, bool>>;

pub const SELECT_ALL: &str = "all";
pub const SELECT_DYNAMIC: &str = "dynamic";
pub const SELECT_CLADE_FOUNDER_MUTS: &str = "clade-founder-muts";
pub const SELECT_REL_MUTS: &str = "rel-muts";

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.85;

const DEFAULT_LAYOUT: &[(&str, &[&str])] = &[
    (
        "general",
        &[
            "index",
            "seqName",
            "clade",
            "qc.overallScore",
            "qc.overallStatus",
            "totalSubstitutions",
            "totalDeletions",
            "totalInsertions",
            "totalFrameShifts",
            "totalMissing",
            "totalNonACGTNs",
            "totalAminoacidSubstitutions",
            "totalAminoacidDeletions",
            "totalAminoacidInsertions",
            "totalUnknownAa",
            "alignmentScore",
            "alignmentStart",
            "alignmentEnd",
            "coverage",
            "isReverseComplement",
        ],
    ),
    (
        "ref-muts",
        &[
            "substitutions",
            "deletions",
            "insertions",
            "frameShifts",
            "aaSubstitutions",
            "aaDeletions",
            "aaInsertions",
        ],
    ),
    (
        "priv-muts",
        &[
            "privateNucMutations.reversionSubstitutions",
            "privateNucMutations.labeledSubstitutions",
            "privateNucMutations.unlabeledSubstitutions",
            "privateNucMutations.totalReversionSubstitutions",
            "privateNucMutations.totalLabeledSubstitutions",
            "privateNucMutations.totalUnlabeledSubstitutions",
            "privateNucMutations.totalPrivateSubstitutions",
        ],
    ),
    (
        "qc",
        &[
            "missing",
            "unknownAaRanges",
            "nonACGTNs",
            "qc.overallScore",
            "qc.overallStatus",
            "qc.missingData.missingDataThreshold",
            "qc.missingData.score",
            "qc.missingData.status",
            "qc.missingData.totalMissing",
            "qc.mixedSites.mixedSitesThreshold",
            "qc.mixedSites.score",
            "qc.mixedSites.status",
            "qc.mixedSites.totalMixedSites",
            "qc.privateMutations.cutoff",
            "qc.privateMutations.excess",
            "qc.privateMutations.score",
            "qc.privateMutations.status",
            "qc.privateMutations.total",
            "qc.snpClusters.clusteredSNPs",
            "qc.snpClusters.score",
            "qc.snpClusters.status",
            "qc.snpClusters.totalSNPs",
            "qc.frameShifts.frameShifts",
            "qc.frameShifts.totalFrameShifts",
            "qc.frameShifts.frameShiftsIgnored",
            "qc.frameShifts.totalFrameShiftsIgnored",
            "qc.frameShifts.score",
            "qc.frameShifts.status",
            "qc.stopCodons.stopCodons",
            "qc.stopCodons.totalStopCodons",
            "qc.stopCodons.score",
            "qc.stopCodons.status",
        ],
    ),
    ("primers", &["totalPcrPrimerChanges", "pcrPrimerChanges"]),
    ("errs-warns", &["failedCdses", "warnings", "errors"]),
];

static DEFAULT_CATEGORIES: LazyLock<ColumnCategories> = LazyLock::new(|| {
    DEFAULT_LAYOUT
        .iter()
        .map(|(category, columns)| {
            let columns = columns
                .iter()
                .map(|column| ((*column).to_string(), true))
                .collect();
            ((*category).to_string(), columns)
        })
        .collect()
});

/// Default category layout with every column enabled.
pub fn default_categories() -> &'static ColumnCategories {
    &DEFAULT_CATEGORIES
}

/// Optional column groups controlled by a flag rather than a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnFlag {
    /// Clade-node attribute, phenotype and motif columns.
    Dynamic,
    CladeFounderMuts,
    RelMuts,
}

impl ColumnFlag {
    pub const ALL: [ColumnFlag; 3] = [Self::Dynamic, Self::CladeFounderMuts, Self::RelMuts];

    pub fn selection_name(self) -> &'static str {
        match self {
            Self::Dynamic => SELECT_DYNAMIC,
            Self::CladeFounderMuts => SELECT_CLADE_FOUNDER_MUTS,
            Self::RelMuts => SELECT_REL_MUTS,
        }
    }
}

/// Which columns CSV, TSV and Excel exports contain.
///
/// `individual` mirrors the enabled leaves of `categories` in display order.
/// It is recomputed on every change and never consulted for a column's
/// state. Deserializing goes through [`CsvColumnConfig::from_layout`], so a
/// file that repeats a category or column name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ColumnConfigRepr")]
pub struct CsvColumnConfig {
    categories: ColumnCategories,
    individual: Vec<String>,
    include_dynamic: bool,
    include_clade_founder_muts: bool,
    include_rel_muts: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnConfigRepr {
    #[serde(default)]
    categories: Entries<Entries<bool>>,
    #[serde(default)]
    include_dynamic: bool,
    #[serde(default)]
    include_clade_founder_muts: bool,
    #[serde(default)]
    include_rel_muts: bool,
}

impl TryFrom<ColumnConfigRepr> for CsvColumnConfig {
    type Error = ModelError;

    fn try_from(repr: ColumnConfigRepr) -> Result<Self> {
        let layout = repr
            .categories
            .0
            .into_iter()
            .map(|(category, columns)| (category, columns.0));
        Ok(Self::from_layout(layout)?
            .with_flag(ColumnFlag::Dynamic, repr.include_dynamic)
            .with_flag(ColumnFlag::CladeFounderMuts, repr.include_clade_founder_muts)
            .with_flag(ColumnFlag::RelMuts, repr.include_rel_muts))
    }
}

/// Map entries in file order, repeated keys included.
struct Entries<V>(Vec<(String, V)>);

impl<V> Default for Entries<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

struct EntriesVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
    type Value = Entries<V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of names")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, V>()? {
            entries.push(entry);
        }
        Ok(Entries(entries))
    }
}

impl Default for CsvColumnConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES.clone())
            .with_flag(ColumnFlag::Dynamic, true)
            .with_flag(ColumnFlag::CladeFounderMuts, true)
            .with_flag(ColumnFlag::RelMuts, true)
    }
}

impl CsvColumnConfig {
    /// Create a configuration from a category layout with all flags off.
    pub fn new(categories: ColumnCategories) -> Self {
        let mut config = Self {
            categories,
            individual: Vec::new(),
            include_dynamic: false,
            include_clade_founder_muts: false,
            include_rel_muts: false,
        };
        config.sync_individual();
        config
    }

    /// Build a configuration from a layout loaded with a dataset.
    ///
    /// Unlike [`CsvColumnConfig::new`], repeated category names or repeated
    /// column names within a category are rejected instead of merged.
    pub fn from_layout<C, L>(layout: L) -> Result<Self>
    where
        L: IntoIterator<Item = (String, C)>,
        C: IntoIterator<Item = (String, bool)>,
    {
        let mut categories = ColumnCategories::new();
        for (category, columns) in layout {
            if categories.contains_key(&category) {
                return Err(ModelError::DuplicateColumn {
                    kind: "category",
                    name: category,
                });
            }
            let mut leaves = IndexMap::new();
            for (column, enabled) in columns {
                if leaves.insert(column.clone(), enabled).is_some() {
                    return Err(ModelError::DuplicateColumn {
                        kind: "column",
                        name: column,
                    });
                }
            }
            categories.insert(category, leaves);
        }
        Ok(Self::new(categories))
    }

    /// Parse a user selection of category names, individual column names
    /// and the `all` / `dynamic` / `clade-founder-muts` / `rel-muts` keywords.
    ///
    /// An empty selection, or one containing `all`, yields the default
    /// configuration. Individually named columns are enabled inside the
    /// first default category that contains them.
    pub fn from_selection(selection: &[String]) -> Result<Self> {
        for name in selection {
            if !is_known_selection(name) {
                return Err(unknown_selection(name));
            }
        }
        if selection.is_empty() || selection.iter().any(|name| name == SELECT_ALL) {
            return Ok(Self::default());
        }

        let has = |keyword: &str| selection.iter().any(|name| name == keyword);
        let mut categories = ColumnCategories::new();
        for name in selection {
            if let Some(columns) = DEFAULT_CATEGORIES.get(name) {
                categories.insert(name.clone(), columns.clone());
            }
        }
        for name in selection {
            if DEFAULT_CATEGORIES.contains_key(name) || is_keyword(name) {
                continue;
            }
            let Some((category, columns)) = DEFAULT_CATEGORIES
                .iter()
                .find(|(_, columns)| columns.contains_key(name))
            else {
                continue;
            };
            let leaves = categories.entry(category.clone()).or_insert_with(|| {
                columns
                    .keys()
                    .map(|column| (column.clone(), false))
                    .collect()
            });
            if let Some(enabled) = leaves.get_mut(name) {
                *enabled = true;
            }
        }

        let config = Self::new(categories)
            .with_flag(ColumnFlag::Dynamic, has(SELECT_DYNAMIC))
            .with_flag(ColumnFlag::CladeFounderMuts, has(SELECT_CLADE_FOUNDER_MUTS))
            .with_flag(ColumnFlag::RelMuts, has(SELECT_REL_MUTS));
        debug!(
            selected = selection.len(),
            enabled = config.individual().len(),
            "parsed column selection"
        );
        Ok(config)
    }

    #[must_use]
    pub fn with_flag(mut self, flag: ColumnFlag, enabled: bool) -> Self {
        self.set_flag(flag, enabled);
        self
    }

    pub fn categories(&self) -> &ColumnCategories {
        &self.categories
    }

    /// Enabled columns in display order (derived).
    pub fn individual(&self) -> &[String] {
        &self.individual
    }

    pub fn flag(&self, flag: ColumnFlag) -> bool {
        match flag {
            ColumnFlag::Dynamic => self.include_dynamic,
            ColumnFlag::CladeFounderMuts => self.include_clade_founder_muts,
            ColumnFlag::RelMuts => self.include_rel_muts,
        }
    }

    pub fn include_dynamic(&self) -> bool {
        self.include_dynamic
    }

    pub fn include_clade_founder_muts(&self) -> bool {
        self.include_clade_founder_muts
    }

    pub fn include_rel_muts(&self) -> bool {
        self.include_rel_muts
    }

    /// Enabled column names in display order, each name once.
    pub fn enabled_columns(&self) -> Vec<&str> {
        let mut seen = Vec::<&str>::new();
        for column in &self.individual {
            if !seen.contains(&column.as_str()) {
                seen.push(column);
            }
        }
        seen
    }

    pub(crate) fn set_flag(&mut self, flag: ColumnFlag, enabled: bool) {
        match flag {
            ColumnFlag::Dynamic => self.include_dynamic = enabled,
            ColumnFlag::CladeFounderMuts => self.include_clade_founder_muts = enabled,
            ColumnFlag::RelMuts => self.include_rel_muts = enabled,
        }
    }

    /// Apply `update` to the category map and recompute the derived list.
    pub(crate) fn update_categories(&mut self, update: impl FnOnce(&mut ColumnCategories)) {
        update(&mut self.categories);
        self.sync_individual();
    }

    fn sync_individual(&mut self) {
        self.individual = self
            .categories
            .values()
            .flat_map(|columns| columns.iter())
            .filter(|(_, enabled)| **enabled)
            .map(|(column, _)| column.clone())
            .collect();
    }
}

fn is_keyword(name: &str) -> bool {
    name == SELECT_ALL || ColumnFlag::ALL.iter().any(|flag| flag.selection_name() == name)
}

fn is_known_selection(name: &str) -> bool {
    is_keyword(name)
        || DEFAULT_CATEGORIES.contains_key(name)
        || DEFAULT_CATEGORIES
            .values()
            .any(|columns| columns.contains_key(name))
}

/// Every name accepted by [`CsvColumnConfig::from_selection`].
pub fn possible_selection_names() -> (Vec<String>, Vec<String>) {
    let mut categories = vec![SELECT_ALL.to_string()];
    categories.extend(DEFAULT_CATEGORIES.keys().cloned());
    categories.extend(
        ColumnFlag::ALL
            .iter()
            .map(|flag| flag.selection_name().to_string()),
    );
    let mut columns = Vec::<String>::new();
    for column in DEFAULT_CATEGORIES.values().flat_map(|columns| columns.keys()) {
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    (categories, columns)
}

fn unknown_selection(name: &str) -> ModelError {
    let (categories, columns) = possible_selection_names();
    let mut scored: Vec<(f64, &String)> = categories
        .iter()
        .chain(columns.iter())
        .map(|candidate| {
            let score = jaro_winkler::similarity(candidate.chars(), name.chars());
            (score, candidate)
        })
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    let suggestions: Vec<&str> = scored
        .iter()
        .take(5)
        .map(|(_, candidate)| candidate.as_str())
        .collect();

    let mut message = format!(
        "unknown column or category name '{name}'.\n\nPossible categories:\n    {}\n\nPossible individual columns:\n    {}",
        categories.join(", "),
        columns.join(", ")
    );
    if !suggestions.is_empty() {
        message.push_str(&format!("\n\nDid you mean: {}?", suggestions.join(", ")));
    }
    ModelError::UnknownColumn {
        name: name.to_string(),
        message,
    }
}
