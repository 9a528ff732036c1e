//! Per-capacity simulation report.

use std::{
    array,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{
    core::{RunResult, step::SimulationRecord},
    prelude::*,
};

const HEADER: [&str; 18] = [
    "from",
    "to",
    "unitPrice",
    "unitPriceVAT",
    "consumption",
    "consumptionUnit",
    "real_consumption",
    "real_cost",
    "battery_level_before",
    "battery_used",
    "grid_usage",
    "grid_cost",
    "battery_cost",
    "battery_recharged",
    "battery_recharge_cost",
    "battery_level_after",
    "note",
    "total_cost_battery_and_grid",
];

const NOTE_COLUMN: usize = 16;
const INVALID_NOTE: &str = "invalid entry";

/// Renders numbers with the fixed precision and the configured decimal separator.
#[derive(Copy, Clone)]
pub struct NumberFormat {
    pub decimal_separator: char,
}

impl NumberFormat {
    const PRECISION: usize = 6;

    fn format(self, value: f64) -> String {
        let formatted = format!("{value:.precision$}", precision = Self::PRECISION);
        if self.decimal_separator == '.' {
            formatted
        } else {
            formatted.replace('.', self.decimal_separator.encode_utf8(&mut [0; 4]))
        }
    }

    fn format_optional(self, value: Option<f64>) -> String {
        value.map(|value| self.format(value)).unwrap_or_default()
    }
}

fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|timestamp| timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn build_row(record: &SimulationRecord, number: NumberFormat) -> [String; HEADER.len()] {
    let input = &record.record;
    let input_cells = [
        format_timestamp(input.from),
        format_timestamp(input.till),
        number.format_optional(input.unit_price.map(|price| price.0)),
        number.format_optional(input.unit_price_vat.map(|price| price.0)),
        number.format_optional(input.consumption.map(|consumption| consumption.0)),
        input.consumption_unit.clone().unwrap_or_default(),
    ];

    let Some(step) = &record.step else {
        // Input cells are kept, the derived ones stay empty:
        let mut input_cells = input_cells.into_iter();
        let mut row: [String; HEADER.len()] =
            array::from_fn(|_| input_cells.next().unwrap_or_default());
        row[NOTE_COLUMN] = INVALID_NOTE.to_string();
        return row;
    };
    let [from, till, unit_price, unit_price_vat, consumption, consumption_unit] = input_cells;

    [
        from,
        till,
        unit_price,
        unit_price_vat,
        consumption,
        consumption_unit,
        number.format(step.real_consumption.0),
        number.format(step.real_cost.0),
        number.format(step.battery_level_before.0),
        number.format(step.battery_used.0),
        number.format(step.grid_usage.0),
        number.format(step.grid_cost.0),
        number.format(step.battery_cost.0),
        number.format(step.recharge_energy.0),
        number.format(step.recharge_cost.0),
        number.format(step.battery_level_after.0),
        step.note.to_string(),
        number.format(step.total_cost.0),
    ]
}

/// Write the `;`-delimited report with a header and one row per input record.
pub fn write_report<W: Write>(result: &RunResult, writer: W, number: NumberFormat) -> Result {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
    writer.write_record(HEADER)?;
    for record in &result.records {
        writer.write_record(build_row(record, number))?;
    }
    writer.flush()?;
    Ok(())
}

/// Save the report into the output directory, unless there is nothing to save.
#[instrument(skip_all, fields(capacity = %result.summary.capacity))]
pub fn save_report(result: &RunResult, output_dir: &Path, number: NumberFormat) -> Result {
    if result.records.is_empty() {
        warn!("no data available, the report will not be created");
        return Ok(());
    }
    let path = output_dir
        .join(format!("tibber_battery_simulation_{}kWh.csv", result.summary.capacity.0));
    let file = File::create(&path)
        .with_context(|| format!("failed to create `{}`", path.display()))?;
    write_report(result, BufWriter::new(file), number)
        .with_context(|| format!("failed to write `{}`", path.display()))?;
    info!(path = %path.display(), "saved the report");
    Ok(())
}
