use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use gapfill_engine::Resolution;

use crate::commands::RunOutcome;

pub fn print_summary(outcome: &RunOutcome) {
    // Keep stdout clean when the imputed records stream there
    let to_stderr = outcome.output.is_none();
    emit(to_stderr, &format!("Records: {} rows", outcome.rows));
    emit(
        to_stderr,
        &format!("Dimensions: {}", outcome.dimensions.join("/")),
    );
    match &outcome.output {
        Some(path) => emit(to_stderr, &format!("Output: {}", path.display())),
        None => emit(to_stderr, "Output: stdout"),
    }

    let totals = outcome.report.column_totals();
    if totals.is_empty() {
        emit(to_stderr, "No imputable gaps found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Method"),
        header_cell("Gaps"),
        header_cell("Filled"),
        header_cell("Remaining"),
        header_cell("Resolution"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Center);

    let mut total_gaps = 0usize;
    let mut total_filled = 0usize;
    let mut total_remaining = 0usize;
    for total in &totals {
        total_gaps += total.gaps_before;
        total_filled += total.filled();
        total_remaining += total.gaps_after;
        table.add_row(vec![
            column_cell(&total.column),
            Cell::new(total.method.as_str()),
            Cell::new(total.gaps_before),
            count_cell(total.filled(), Color::Green),
            count_cell(total.gaps_after, Color::Yellow),
            resolution_cell(total.resolution()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total_gaps).add_attribute(Attribute::Bold),
        count_cell(total_filled, Color::Green).add_attribute(Attribute::Bold),
        count_cell(total_remaining, Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    emit(to_stderr, &table.to_string());
    emit(to_stderr, &format!("Time: {} ms", outcome.duration_ms));
}

fn emit(to_stderr: bool, text: &str) {
    if to_stderr {
        eprintln!("{text}");
    } else {
        println!("{text}");
    }
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn column_cell(name: &str) -> Cell {
    Cell::new(name)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn resolution_cell(resolution: Resolution) -> Cell {
    match resolution {
        Resolution::Full => Cell::new(resolution.as_str()).fg(Color::Green),
        Resolution::Partial => Cell::new(resolution.as_str()).fg(Color::Yellow),
        Resolution::Unresolved => Cell::new(resolution.as_str())
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
