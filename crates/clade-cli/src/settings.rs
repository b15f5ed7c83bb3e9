//! Exporter settings read from a TOML file.
//!
//! ```toml
//! [export]
//! filename_csv = "results.csv"
//!
//! [columns]
//! select = ["general", "qc"]
//! dynamic = false
//!
//! [worker]
//! timeout_secs = 120
//! ```
//!
//! Every table and key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clade_export::WorkerConfig;
use clade_model::{ColumnFlag, CsvColumnConfig, ExportParams};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Output filenames.
    pub export: ExportParams,

    pub columns: ColumnSettings,

    pub worker: WorkerSettings,
}

/// Column selection applied when the command line does not name one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSettings {
    /// Categories, columns and keywords as accepted by `--columns`.
    pub select: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clade_founder_muts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel_muts: Option<bool>,
}

impl ColumnSettings {
    /// Build the column configuration.
    ///
    /// A non-empty `selection` replaces `select`. When neither names any
    /// column, `defaults` is used as is. The flag overrides apply in every
    /// case.
    pub fn resolve(
        &self,
        selection: &[String],
        defaults: &CsvColumnConfig,
    ) -> clade_model::Result<CsvColumnConfig> {
        let names = if selection.is_empty() {
            &self.select
        } else {
            selection
        };
        let mut config = if names.is_empty() {
            defaults.clone()
        } else {
            CsvColumnConfig::from_selection(names)?
        };
        for (flag, value) in [
            (ColumnFlag::Dynamic, self.dynamic),
            (ColumnFlag::CladeFounderMuts, self.clade_founder_muts),
            (ColumnFlag::RelMuts, self.rel_muts),
        ] {
            if let Some(enabled) = value {
                config = config.with_flag(flag, enabled);
            }
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Seconds to wait for one serialization before giving up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl WorkerSettings {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            call_timeout: self.timeout_secs.map(Duration::from_secs),
            ..WorkerConfig::default()
        }
    }
}

impl Settings {
    /// Load `explicit` when given, else the default file if it exists, else
    /// the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let path = Self::default_path();
        if path.is_file() {
            Self::load_from(&path)
        } else {
            debug!(path = %path.display(), "no settings file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read settings {}", path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("parse settings {}", path.display()))?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create config directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("serialize settings")?;
        std::fs::write(path, content).with_context(|| format!("write settings {}", path.display()))
    }

    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("org", "clade", "clade-export")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
            .unwrap_or_else(|| PathBuf::from("clade-export.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tables_keep_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [export]
            filename_csv = "results.csv"

            [worker]
            timeout_secs = 5
            "#,
        )
        .expect("parse");
        assert_eq!(settings.export.filename_csv, "results.csv");
        assert_eq!(settings.export.filename_tsv, "nextclade.tsv");
        assert_eq!(
            settings.worker.worker_config().call_timeout,
            Some(Duration::from_secs(5))
        );
        assert!(settings.columns.select.is_empty());
    }

    #[test]
    fn command_line_selection_wins_but_flags_still_apply() {
        let columns = ColumnSettings {
            select: vec!["qc".to_string()],
            dynamic: Some(false),
            ..ColumnSettings::default()
        };

        let defaults = CsvColumnConfig::default();
        let from_file = columns.resolve(&[], &defaults).expect("resolve");
        assert!(from_file.categories().contains_key("qc"));
        assert!(!from_file.categories().contains_key("general"));

        let from_cli = columns
            .resolve(&["all".to_string()], &defaults)
            .expect("resolve");
        assert!(from_cli.categories().contains_key("general"));
        assert!(!from_cli.include_dynamic());
        assert!(from_cli.include_rel_muts());
    }

    #[test]
    fn empty_selection_keeps_dataset_defaults() {
        let defaults = CsvColumnConfig::from_selection(&["primers".to_string()])
            .expect("parse")
            .with_flag(ColumnFlag::RelMuts, true);
        let columns = ColumnSettings {
            dynamic: Some(true),
            ..ColumnSettings::default()
        };

        let config = columns.resolve(&[], &defaults).expect("resolve");
        assert_eq!(config.categories(), defaults.categories());
        assert!(config.include_dynamic());
        assert!(config.include_rel_muts());
    }
}
