//! Terminal summary tables.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cmed_model::RunSummary;
use cmed_normalize::RuleTable;

use crate::pipeline::RunOutputs;

pub fn print_summary(outputs: &RunOutputs) {
    let summary = &outputs.summary;
    println!("Output: {}", outputs.output_dir.display());
    println!("Resolved dataset: {}", outputs.resolved_csv.display());
    println!("Triage export: {}", outputs.triage_csv.display());
    if summary.incomplete_run {
        println!("NOTE: wall-clock budget expired; results are partial (see manifest).");
    }

    let mut table = Table::new();
    table.set_header(vec![header_cell("Stage"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);

    table.add_row(vec![
        Cell::new("Registry products"),
        Cell::new(summary.registry_products),
    ]);
    table.add_row(vec![
        Cell::new("Validity intervals (before -> after)"),
        Cell::new(format!(
            "{} -> {}",
            summary.intervals_before, summary.intervals_after
        )),
    ]);
    table.add_row(vec![
        Cell::new("Transactions read"),
        Cell::new(summary.transactions_total),
    ]);
    table.add_row(vec![
        Cell::new("Malformed rows skipped"),
        count_cell(summary.malformed_skipped, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Resolved tier 1 (barcode)"),
        Cell::new(summary.resolved_tier1).fg(Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Resolved tier 2 (unique description)"),
        Cell::new(summary.resolved_tier2).fg(Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Resolved tier 3 (fuzzy)"),
        Cell::new(summary.resolved_tier3).fg(Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Tier-2 ambiguous (deferred)"),
        Cell::new(summary.tier2_ambiguous),
    ]);
    table.add_row(vec![
        Cell::new("Unresolved"),
        count_cell(summary.unresolved, Color::Yellow),
    ]);
    if summary.unattempted > 0 {
        table.add_row(vec![
            Cell::new("Unattempted (budget expired)"),
            count_cell(summary.unattempted, Color::Red),
        ]);
    }
    if let Some(mean) = summary.mean_tier3_score {
        table.add_row(vec![
            Cell::new("Mean tier-3 score"),
            Cell::new(format!("{mean:.4}")),
        ]);
    }
    table.add_row(vec![
        Cell::new("Resolution rate")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{:.1}%", summary.resolution_rate() * 100.0))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Duration"),
        Cell::new(format!("{:.2}s", summary.duration_secs)),
    ]);
    println!("{table}");
}

pub fn print_rules(rule_table: &RuleTable) {
    println!("Rule table version {}", rule_table.version());

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Pattern"),
        header_cell("Replacement"),
        header_cell("Scope"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, rule) in rule_table.rules().iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(rule.pattern_str()),
            Cell::new(rule.replacement()),
            Cell::new(format!("{:?}", rule.scope())),
        ]);
    }
    println!("{table}");

    if !rule_table.substrings().is_empty() {
        let mut table = Table::new();
        table.set_header(vec![header_cell("Substring"), header_cell("Replacement")]);
        apply_table_style(&mut table);
        for rule in rule_table.substrings() {
            table.add_row(vec![Cell::new(&rule.find), Cell::new(&rule.replace)]);
        }
        println!("{table}");
    }

    if !rule_table.bypass_terms().is_empty() {
        println!("Bypass terms: {}", rule_table.bypass_terms().join(", "));
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
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

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        Cell::new(count).fg(Color::DarkGrey)
    }
}
