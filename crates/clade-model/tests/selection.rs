//! Property tests for column selection.

use clade_model::selection::{
    all_categories_state, category_state, enable_all_categories, enable_category, enable_column,
    set_everything,
};
use clade_model::{ColumnCategories, ColumnFlag, CsvColumnConfig, TriState};
use indexmap::IndexMap;
use proptest::prelude::*;

fn config_strategy() -> impl Strategy<Value = CsvColumnConfig> {
    let category = prop::collection::vec(any::<bool>(), 0..5);
    (
        prop::collection::vec(category, 0..4),
        any::<[bool; 3]>(),
    )
        .prop_map(|(layout, flags)| {
            let categories: ColumnCategories = layout
                .into_iter()
                .enumerate()
                .map(|(cat, columns)| {
                    let columns: IndexMap<String, bool> = columns
                        .into_iter()
                        .enumerate()
                        .map(|(col, enabled)| (format!("c{cat}_{col}"), enabled))
                        .collect();
                    (format!("cat{cat}"), columns)
                })
                .collect();
            CsvColumnConfig::new(categories)
                .with_flag(ColumnFlag::Dynamic, flags[0])
                .with_flag(ColumnFlag::CladeFounderMuts, flags[1])
                .with_flag(ColumnFlag::RelMuts, flags[2])
        })
}

fn has_leaves(config: &CsvColumnConfig) -> bool {
    config.categories().values().any(|columns| !columns.is_empty())
}

proptest! {
    #[test]
    fn all_state_checked_iff_everything_is_a_no_op(config in config_strategy()) {
        prop_assume!(!config.categories().is_empty());
        let everything = set_everything(&config, true);
        let checked = all_categories_state(Some(&config)) == TriState::Checked;
        prop_assert_eq!(checked, everything == config);
    }

    #[test]
    fn all_state_unchecked_iff_nothing_is_a_no_op(config in config_strategy()) {
        prop_assume!(!config.categories().is_empty());
        let nothing = set_everything(&config, false);
        let unchecked = all_categories_state(Some(&config)) == TriState::Unchecked;
        prop_assert_eq!(unchecked, nothing == config);
    }

    #[test]
    fn enable_category_is_idempotent(config in config_strategy(), enabled in any::<bool>()) {
        let once = enable_category(&config, "cat0", enabled);
        let twice = enable_category(&once, "cat0", enabled);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn enable_column_on_absent_category_is_identity(config in config_strategy()) {
        prop_assert_eq!(enable_column(&config, "nonexistent", "x", true), config);
    }

    #[test]
    fn individual_matches_enabled_leaves(config in config_strategy(), enabled in any::<bool>()) {
        let next = enable_column(&config, "cat0", "c0_0", enabled);
        let expected: Vec<String> = next
            .categories()
            .values()
            .flat_map(|columns| columns.iter())
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.clone())
            .collect();
        prop_assert_eq!(next.individual(), expected.as_slice());
    }

    #[test]
    fn enable_all_categories_leaves_flags(config in config_strategy(), enabled in any::<bool>()) {
        let next = enable_all_categories(&config, enabled);
        for flag in ColumnFlag::ALL {
            prop_assert_eq!(next.flag(flag), config.flag(flag));
        }
        if has_leaves(&next) {
            for category in next.categories().keys() {
                let state = category_state(Some(&next), category);
                let non_empty = !next.categories()[category].is_empty();
                if non_empty {
                    let expected = if enabled { TriState::Checked } else { TriState::Unchecked };
                    prop_assert_eq!(state, expected);
                }
            }
        }
    }
}

#[test]
fn default_layout_is_fully_checked() {
    let config = CsvColumnConfig::default();
    assert_eq!(all_categories_state(Some(&config)), TriState::Checked);
    for category in config.categories().keys() {
        assert_eq!(category_state(Some(&config), category), TriState::Checked);
    }
}
