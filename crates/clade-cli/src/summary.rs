use clade_cli::{ArtifactStatus, ExportReport};
use clade_model::selection::{all_categories_state, category_state};
use clade_model::{ColumnFlag, CsvColumnConfig, TriState};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

pub fn print_summary(report: &ExportReport) {
    println!("Output: {}", report.output_dir.display());
    println!("Outcomes: {}", report.outcomes);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Format"),
        header_cell("Dataset"),
        header_cell("File"),
        header_cell("Bytes"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    for row in &report.rows {
        let dataset = match &row.dataset {
            Some(name) => Cell::new(name),
            None => dim_cell("-"),
        };
        let (file, bytes, status) = match &row.status {
            ArtifactStatus::Written(saved) => (
                Cell::new(&saved.filename),
                Cell::new(saved.bytes),
                Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold),
            ),
            ArtifactStatus::Skipped => (dim_cell("-"), dim_cell("-"), dim_cell("skipped")),
            ArtifactStatus::Failed(_) => (
                dim_cell("-"),
                dim_cell("-"),
                Cell::new("failed").fg(Color::Red).add_attribute(Attribute::Bold),
            ),
        };
        table.add_row(vec![Cell::new(row.kind), dataset, file, bytes, status]);
    }
    println!("{table}");

    let failures: Vec<_> = report
        .rows
        .iter()
        .filter_map(|row| match &row.status {
            ArtifactStatus::Failed(message) => Some((row, message)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        eprintln!("Errors:");
        for (row, message) in failures {
            match &row.dataset {
                Some(dataset) => eprintln!("- {} ({dataset}): {message}", row.kind),
                None => eprintln!("- {}: {message}", row.kind),
            }
        }
    }
}

pub fn print_columns(config: &CsvColumnConfig) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Category"),
        header_cell("State"),
        header_cell("Enabled"),
        header_cell("Columns"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    for (category, columns) in config.categories() {
        let enabled: Vec<&str> = columns
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(column, _)| column.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(category).add_attribute(Attribute::Bold),
            state_cell(category_state(Some(config), category)),
            Cell::new(format!("{}/{}", enabled.len(), columns.len())),
            Cell::new(enabled.join(", ")),
        ]);
    }
    for flag in ColumnFlag::ALL {
        let state = if config.flag(flag) {
            TriState::Checked
        } else {
            TriState::Unchecked
        };
        table.add_row(vec![
            Cell::new(flag.selection_name()).fg(Color::Cyan),
            state_cell(state),
            dim_cell("-"),
            dim_cell("dataset-dependent"),
        ]);
    }
    table.add_row(vec![
        Cell::new("all").fg(Color::Cyan).add_attribute(Attribute::Bold),
        state_cell(all_categories_state(Some(config))),
        Cell::new(config.enabled_columns().len()).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");
}

fn state_cell(state: TriState) -> Cell {
    match state {
        TriState::Checked => Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold),
        TriState::Indeterminate => Cell::new("~").fg(Color::Yellow),
        TriState::Unchecked => dim_cell("-"),
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
