use std::path::Path;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use hdw_cli::profile::{FileOutcome, ProfileRun};
use hdw_cli::{RunOutcome, RunError};
use hdw_model::{EntityOutcome, OutcomeStatus, StageReport, StageStatus, TableReport};

pub fn print_run_summary(outcome: &RunOutcome) {
    for stage in &outcome.report.stages {
        if !stage.entities.is_empty() {
            print_entity_table(&stage.entities);
        }
        if !stage.tables.is_empty() {
            print_table_reports(&stage.tables);
        }
        print_stage_line(stage);
    }
    println!("Run report: {}", outcome.run_report_path.display());
    println!(
        "Status: {}",
        status_label(outcome.report.status, outcome.report.exit_code())
    );
}

pub fn print_profile_summary(run: &ProfileRun, report_path: &Path) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("Duplicates"),
        header_cell("Status"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for file in &run.files {
        match file {
            FileOutcome::Profiled(profile) => table.add_row(vec![
                name_cell(&profile.file_name),
                Cell::new(profile.rows),
                Cell::new(profile.columns.len()),
                count_cell(profile.duplicate_rows, Color::Yellow),
                Cell::new("profiled").fg(Color::Green),
            ]),
            FileOutcome::Failed { file_name, message } => table.add_row(vec![
                name_cell(file_name),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                Cell::new(message).fg(Color::Red),
            ]),
        };
    }
    println!("{table}");
    print_stage_line(&run.stage_report());
    println!("Report: {}", report_path.display());
}

fn print_entity_table(outcomes: &[EntityOutcome]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Entity"),
        header_cell("Input"),
        header_cell("Output"),
        header_cell("Duplicates"),
        header_cell("Dropped"),
        header_cell("Defaults"),
        header_cell("Skipped rules"),
        header_cell("Status"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut total_input = 0usize;
    let mut total_output = 0usize;
    for outcome in outcomes {
        match &outcome.report {
            Some(report) => {
                total_input += report.input_rows;
                total_output += report.output_rows;
                table.add_row(vec![
                    name_cell(outcome.entity.file_stem()),
                    Cell::new(report.input_rows),
                    Cell::new(report.output_rows),
                    count_cell(report.duplicates_removed, Color::Yellow),
                    count_cell(report.rows_dropped, Color::Yellow),
                    count_cell(report.total_defaults(), Color::Yellow),
                    count_cell(report.skipped_rules.len(), Color::Red),
                    outcome_cell(outcome.status, None),
                ]);
            }
            None => {
                table.add_row(vec![
                    name_cell(outcome.entity.file_stem()),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    outcome_cell(outcome.status, outcome.message.as_deref()),
                ]);
            }
        }
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_input).add_attribute(Attribute::Bold),
        Cell::new(total_output).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!("{table}");
}

fn print_table_reports(reports: &[TableReport]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Rows"),
        header_cell("Orphans"),
        header_cell("Dropped"),
        header_cell("Status"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for report in reports {
        let orphans: Vec<String> = report
            .orphans
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(key, count)| format!("{key}={count}"))
            .collect();
        let orphan_cell = if orphans.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(orphans.join(", ")).fg(Color::Yellow)
        };
        table.add_row(vec![
            name_cell(&report.table),
            Cell::new(report.rows),
            orphan_cell,
            count_cell(report.rows_dropped, Color::Yellow),
            outcome_cell(report.status, report.message.as_deref()),
        ]);
    }
    println!("{table}");
}

fn print_stage_line(stage: &StageReport) {
    println!(
        "{} stage: {} in {} ms",
        stage.stage.as_str(),
        stage.status.label(),
        stage.duration_ms
    );
}

/// Prints the entity schemas.
pub fn print_entities() {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Entity"),
        header_cell("Input file"),
        header_cell("Key"),
        header_cell("Output table"),
        header_cell("Columns"),
    ]);
    apply_table_style(&mut table);
    for entity in hdw_model::Entity::ALL {
        let schema = hdw_model::schema_for(entity);
        let (output, columns) = match schema.dimension {
            Some(dimension) => (dimension.name.to_string(), dimension.columns.join(", ")),
            None => (
                hdw_model::FACT_TABLE.to_string(),
                hdw_model::FACT_COLUMNS.join(", "),
            ),
        };
        table.add_row(vec![
            name_cell(entity.as_str()),
            Cell::new(entity.raw_file_name()),
            Cell::new(schema.key),
            Cell::new(output),
            Cell::new(columns),
        ]);
    }
    println!("{table}");
}

pub fn print_error(error: &anyhow::Error) {
    eprintln!("error: {error}");
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
    if let Some(RunError::LockHeld { path, .. }) = error.downcast_ref::<RunError>() {
        eprintln!("remove {} if no other run is active", path.display());
    }
}

fn status_label(status: StageStatus, exit_code: i32) -> String {
    format!("{} (exit {exit_code})", status.label())
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn outcome_cell(status: OutcomeStatus, message: Option<&str>) -> Cell {
    let text = match message {
        Some(message) => format!("{}: {message}", status.label()),
        None => status.label().to_string(),
    };
    match status {
        OutcomeStatus::Written => Cell::new(text).fg(Color::Green),
        OutcomeStatus::Skipped => Cell::new(text).fg(Color::Yellow),
        OutcomeStatus::Failed => Cell::new(text)
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn name_cell(name: &str) -> Cell {
    Cell::new(name)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
