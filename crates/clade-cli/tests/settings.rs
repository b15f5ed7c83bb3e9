use std::fs;

use clade_cli::Settings;
use clade_cli::input::{read_catalog, read_outcomes};
use tempfile::tempdir;

#[test]
fn saved_settings_load_back() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested/settings.toml");
    let mut settings = Settings::default();
    settings.export.filename_zip = "everything.zip".to_string();
    settings.columns.select = vec!["general".to_string(), "qc".to_string()];
    settings.columns.rel_muts = Some(false);
    settings.worker.timeout_secs = Some(30);

    settings.save_to(&path).expect("save");
    let loaded = Settings::load(Some(&path)).expect("load");

    assert_eq!(loaded, settings);
}

#[test]
fn default_settings_file_is_readable_toml() {
    let text = toml::to_string_pretty(&Settings::default()).expect("serialize");
    insta::assert_snapshot!(text.lines().next().unwrap_or_default(), @"[export]");
    assert!(text.contains("filename_peptides_template = \"nextclade.peptide.{{gene}}.fasta\""));
    assert!(!text.contains("timeout_secs"));
}

#[test]
fn explicit_settings_path_must_exist() {
    let dir = tempdir().expect("tempdir");
    let error = Settings::load(Some(&dir.path().join("missing.toml"))).expect_err("missing");
    assert!(error.to_string().starts_with("read settings "));
}

#[test]
fn invalid_settings_are_reported() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("settings.toml");
    fs::write(&path, "[worker]\ntimeout_secs = \"soon\"\n").expect("write");
    let error = Settings::load_from(&path).expect_err("invalid");
    assert!(error.to_string().starts_with("parse settings "));
}

#[test]
fn inputs_are_read_from_disk() {
    let dir = tempdir().expect("tempdir");
    let outcomes = dir.path().join("outcomes.ndjson");
    fs::write(
        &outcomes,
        concat!(
            r#"{"index":1,"seqName":"b","error":"no seed matches","datasetName":"flu"}"#,
            "\n",
            r#"{"index":0,"seqName":"a","result":{"analysisResult":{"index":0,"seqName":"a","datasetName":"flu","clade":"3C"},"query":"AC"}}"#,
            "\n",
        ),
    )
    .expect("write outcomes");
    let datasets = dir.path().join("datasets.json");
    fs::write(&datasets, r#"[{"name":"flu","genes":["HA"]},{"name":"rsv"}]"#)
        .expect("write datasets");

    let outcomes = read_outcomes(&outcomes).expect("outcomes");
    let catalog = read_catalog(&datasets).expect("catalog");

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].dataset_name(), Some("flu"));
    assert_eq!(
        outcomes[1].as_success().and_then(|success| success.analysis_result.clade.as_deref()),
        Some("3C")
    );
    assert_eq!(catalog.names().collect::<Vec<_>>(), ["flu", "rsv"]);
    assert!(catalog.get("flu").is_some_and(|bundle| bundle.has_peptides()));
}
