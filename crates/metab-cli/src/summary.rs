use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use metab_cli::pipeline::RunReport;
use metab_output::StageCounts;

pub fn print_summary(report: &RunReport) {
    println!("Command: {}", report.command);
    println!("Output: {}", report.output_dir.display());

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Measure"),
        header_cell("Count"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for (stage, measure, count, color) in stage_rows(&report.counts) {
        table.add_row(vec![stage_cell(stage), Cell::new(measure), count_cell(count, color)]);
    }
    println!("{table}");

    let mut files = Table::new();
    files.set_header(vec![header_cell("Artifact")]);
    apply_table_style(&mut files);
    for path in &report.written {
        files.add_row(vec![Cell::new(path.display())]);
    }
    println!("{files}");
}

type Row = (&'static str, &'static str, usize, Option<Color>);

fn stage_rows(counts: &StageCounts) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();
    if let Some(h) = &counts.harmonize {
        rows.extend([
            ("harmonize", "candidate patients", h.candidates, None),
            ("", "valid", h.valid, None),
            ("", "two-vial conflicts", h.two_vial, Some(Color::Yellow)),
            ("", "not in master", h.not_in_master, Some(Color::Yellow)),
            ("", "phenotype mismatches", h.phenotype_mismatches, Some(Color::Yellow)),
            ("", "rows assembled", h.rows, None),
            ("", "without metabolite row", h.unmatched, Some(Color::Yellow)),
            ("", "outliers capped", h.outliers_corrected, None),
        ]);
    }
    if let Some(c) = &counts.clean {
        rows.extend([
            ("clean", "rows kept", c.rows_after, None),
            ("", "rows removed", c.rows_before - c.rows_after, Some(Color::Yellow)),
            ("", "metabolites kept", c.metabolites_after, None),
            (
                "",
                "metabolites removed",
                c.metabolites_before - c.metabolites_after,
                Some(Color::Yellow),
            ),
            ("", "outliers replaced", c.outliers_replaced, None),
            ("", "values imputed", c.values_imputed, None),
        ]);
    }
    if let Some(f) = &counts.filter {
        rows.extend([
            ("filter", "metabolites kept", f.metabolites_after, None),
            (
                "",
                "metabolites removed",
                f.metabolites_before - f.metabolites_after,
                Some(Color::Yellow),
            ),
        ]);
    }
    if let Some(n) = &counts.normalize {
        rows.extend([
            ("normalize", "tested", n.tested, None),
            ("", "non-normal before", n.failing_before, Some(Color::Yellow)),
            ("", "non-normal after", n.failing_after, Some(Color::Yellow)),
            ("", "log-transformed", n.transformed, None),
            ("", "dropped", n.dropped, Some(Color::Yellow)),
        ]);
    }
    rows
}

pub fn apply_table_style(table: &mut Table) {
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
        .set_width(100);
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

fn stage_cell(stage: &str) -> Cell {
    Cell::new(stage)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Highlights non-zero counts that deserve attention.
fn count_cell(count: usize, color: Option<Color>) -> Cell {
    match color {
        Some(color) if count > 0 => Cell::new(count).fg(color).add_attribute(Attribute::Bold),
        _ if count == 0 => dim_cell(count),
        _ => Cell::new(count),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
