//! Pure update and query functions over [`CsvColumnConfig`].
//!
//! Updates never modify their argument; each returns a new configuration.
//! Names that are not part of the configuration are ignored, so callers may
//! issue updates before the column layout has been loaded.

use serde::{Deserialize, Serialize};

use crate::columns::{ColumnFlag, CsvColumnConfig};

/// Displayable state of a checkbox standing for a set of booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriState {
    Unchecked,
    Checked,
    Indeterminate,
}

impl TriState {
    /// Derive the state of a set of booleans.
    ///
    /// An empty set is `Unchecked`.
    pub fn from_values(values: impl IntoIterator<Item = bool>) -> Self {
        let mut enabled = 0usize;
        let mut total = 0usize;
        for value in values {
            total += 1;
            if value {
                enabled += 1;
            }
        }
        if enabled == 0 {
            Self::Unchecked
        } else if enabled == total {
            Self::Checked
        } else {
            Self::Indeterminate
        }
    }
}

pub fn enable_column(
    config: &CsvColumnConfig,
    category: &str,
    column: &str,
    enabled: bool,
) -> CsvColumnConfig {
    let mut next = config.clone();
    let present = config
        .categories()
        .get(category)
        .is_some_and(|columns| columns.contains_key(column));
    if present {
        next.update_categories(|categories| {
            if let Some(leaf) = categories
                .get_mut(category)
                .and_then(|columns| columns.get_mut(column))
            {
                *leaf = enabled;
            }
        });
    }
    next
}

pub fn enable_category(config: &CsvColumnConfig, category: &str, enabled: bool) -> CsvColumnConfig {
    let mut next = config.clone();
    if config.categories().contains_key(category) {
        next.update_categories(|categories| {
            if let Some(columns) = categories.get_mut(category) {
                columns.values_mut().for_each(|leaf| *leaf = enabled);
            }
        });
    }
    next
}

/// Set every category's columns. Flags are left untouched.
pub fn enable_all_categories(config: &CsvColumnConfig, enabled: bool) -> CsvColumnConfig {
    let mut next = config.clone();
    next.update_categories(|categories| {
        categories
            .values_mut()
            .flat_map(|columns| columns.values_mut())
            .for_each(|leaf| *leaf = enabled);
    });
    next
}

pub fn set_flag(config: &CsvColumnConfig, flag: ColumnFlag, enabled: bool) -> CsvColumnConfig {
    config.clone().with_flag(flag, enabled)
}

pub fn toggle_flag(config: &CsvColumnConfig, flag: ColumnFlag) -> CsvColumnConfig {
    set_flag(config, flag, !config.flag(flag))
}

/// The "everything" action: all categories and all flags.
pub fn set_everything(config: &CsvColumnConfig, enabled: bool) -> CsvColumnConfig {
    ColumnFlag::ALL
        .iter()
        .fold(enable_all_categories(config, enabled), |next, flag| {
            next.with_flag(*flag, enabled)
        })
}

pub fn category_state(config: Option<&CsvColumnConfig>, category: &str) -> TriState {
    config
        .and_then(|config| config.categories().get(category))
        .map_or(TriState::Unchecked, |columns| {
            TriState::from_values(columns.values().copied())
        })
}

/// State over every column of every category together with the flags.
///
/// A configuration without categories is always `Unchecked`.
pub fn all_categories_state(config: Option<&CsvColumnConfig>) -> TriState {
    let Some(config) = config else {
        return TriState::Unchecked;
    };
    if config.categories().is_empty() {
        return TriState::Unchecked;
    }
    let leaves = config
        .categories()
        .values()
        .flat_map(|columns| columns.values().copied());
    let flags = ColumnFlag::ALL.iter().map(|flag| config.flag(*flag));
    TriState::from_values(leaves.chain(flags))
}

pub fn column_state(config: Option<&CsvColumnConfig>, category: &str, column: &str) -> bool {
    config
        .and_then(|config| config.categories().get(category))
        .and_then(|columns| columns.get(column))
        .copied()
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnCategories;
    use indexmap::IndexMap;

    fn qc_config() -> CsvColumnConfig {
        let mut categories = ColumnCategories::new();
        categories.insert(
            "qc".to_string(),
            IndexMap::from([("a".to_string(), true), ("b".to_string(), false)]),
        );
        CsvColumnConfig::new(categories)
    }

    #[test]
    fn qc_category_goes_from_indeterminate_to_checked() {
        let config = qc_config();
        assert_eq!(category_state(Some(&config), "qc"), TriState::Indeterminate);
        let enabled = enable_category(&config, "qc", true);
        assert_eq!(category_state(Some(&enabled), "qc"), TriState::Checked);
        assert_eq!(enabled.individual(), &["a".to_string(), "b".to_string()]);
        assert_eq!(category_state(Some(&config), "qc"), TriState::Indeterminate);
    }

    #[test]
    fn absent_names_are_no_ops() {
        let config = qc_config();
        assert_eq!(enable_column(&config, "nonexistent", "x", true), config);
        assert_eq!(enable_column(&config, "qc", "x", true), config);
        assert_eq!(enable_category(&config, "nonexistent", false), config);
    }

    #[test]
    fn queries_on_missing_config() {
        assert_eq!(category_state(None, "qc"), TriState::Unchecked);
        assert_eq!(all_categories_state(None), TriState::Unchecked);
        assert!(!column_state(None, "qc", "a"));
        let config = qc_config();
        assert!(column_state(Some(&config), "qc", "a"));
        assert!(!column_state(Some(&config), "qc", "b"));
        assert!(!column_state(Some(&config), "qc", "c"));
    }

    #[test]
    fn empty_categories_are_unchecked_even_with_flags() {
        let config = CsvColumnConfig::new(ColumnCategories::new()).with_flag(ColumnFlag::Dynamic, true);
        assert_eq!(all_categories_state(Some(&config)), TriState::Unchecked);
        assert_eq!(category_state(Some(&config), "qc"), TriState::Unchecked);
    }

    #[test]
    fn flags_participate_in_all_state() {
        let config = enable_all_categories(&qc_config(), true);
        assert_eq!(all_categories_state(Some(&config)), TriState::Indeterminate);
        let config = set_everything(&config, true);
        assert_eq!(all_categories_state(Some(&config)), TriState::Checked);
        let config = toggle_flag(&config, ColumnFlag::RelMuts);
        assert_eq!(all_categories_state(Some(&config)), TriState::Indeterminate);
        let config = set_everything(&config, false);
        assert_eq!(all_categories_state(Some(&config)), TriState::Unchecked);
        assert!(config.individual().is_empty());
    }

    #[test]
    fn enable_column_keeps_individual_in_sync() {
        let config = enable_column(&qc_config(), "qc", "a", false);
        assert!(config.individual().is_empty());
        let config = enable_column(&config, "qc", "b", true);
        assert_eq!(config.individual(), &["b".to_string()]);
    }
}
