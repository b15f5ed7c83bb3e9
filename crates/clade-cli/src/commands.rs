use std::path::Path;

use anyhow::{Context, Result, bail};
use clade_cli::input::{read_catalog, read_outcomes};
use clade_cli::{ExportReport, ExportRequest, Settings, run_export as run_pipeline};
use clade_export::ExportKind;
use clade_model::CsvColumnConfig;
use tracing::info;

use crate::cli::{ColumnsArgs, ExportArgs, InitConfigArgs};
use crate::summary::print_columns;

pub fn run_export(args: &ExportArgs, config: Option<&Path>) -> Result<ExportReport> {
    let settings = Settings::load(config)?;
    let outcomes = read_outcomes(&args.outcomes)?;
    let catalog = read_catalog(&args.datasets)?;
    let columns = settings
        .columns
        .resolve(&args.columns, &catalog.column_defaults())
        .context("resolve column selection")?;
    let kinds = if args.format.is_empty() {
        ExportKind::ALL.to_vec()
    } else {
        args.format.iter().map(|format| format.kind()).collect()
    };

    let request = ExportRequest {
        outcomes,
        catalog,
        columns: Some(columns),
        params: settings.export,
        worker: settings.worker.worker_config(),
        output_dir: args.output_dir.clone(),
        kinds,
        datasets: args.dataset.clone(),
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    runtime.block_on(run_pipeline(request))
}

pub fn run_columns(args: &ColumnsArgs, config: Option<&Path>) -> Result<()> {
    let settings = Settings::load(config)?;
    let defaults = match &args.datasets {
        Some(path) => read_catalog(path)?.column_defaults(),
        None => CsvColumnConfig::default(),
    };
    let columns = settings
        .columns
        .resolve(&args.columns, &defaults)
        .context("resolve column selection")?;
    print_columns(&columns);
    Ok(())
}

pub fn run_init_config(args: &InitConfigArgs) -> Result<()> {
    let path = args.path.clone().unwrap_or_else(Settings::default_path);
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }
    Settings::default().save_to(&path)?;
    info!(path = %path.display(), "wrote settings");
    println!("Settings: {}", path.display());
    Ok(())
}
