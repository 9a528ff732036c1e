use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{core::Summary, quantity::cost::Cost};

#[must_use]
pub fn build_summary_table(summaries: &[Summary]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table.set_header(vec![
        "Capacity",
        "Grid only",
        "With battery",
        "Savings",
        "Discharged",
        "Recharged",
        "Invalid",
    ]);
    for summary in summaries {
        let savings = summary.savings();
        table.add_row(vec![
            Cell::new(summary.capacity).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", summary.total_cost_grid_only))
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            Cell::new(format!("{:.2}", summary.total_cost_with_battery))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{savings:+.2}")).set_alignment(CellAlignment::Right).fg(
                if savings >= Cost::ONE_CENT {
                    Color::Green
                } else if savings > -Cost::ONE_CENT {
                    Color::Reset
                } else {
                    Color::Red
                },
            ),
            Cell::new(format!("{:.1}", summary.discharged)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", summary.recharged)).set_alignment(CellAlignment::Right),
            Cell::new(summary.n_invalid_records).set_alignment(CellAlignment::Right).fg(
                if summary.n_invalid_records == 0 { Color::Reset } else { Color::DarkYellow },
            ),
        ]);
    }
    table
}
