use std::{ops::RangeInclusive, path::PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use itertools::Itertools;

use crate::{
    core::{MedianConvention, Simulator},
    export::simulation::NumberFormat,
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: fetch the consumption from Tibber and simulate the battery capacities.
    #[clap(name = "simulate")]
    Simulate(Box<SimulateArgs>),

    /// Simulate a previously saved series without calling the API.
    #[clap(name = "replay")]
    Replay(Box<ReplayArgs>),
}

#[derive(Parser)]
pub struct SimulateArgs {
    /// Tibber API access token.
    #[clap(long = "tibber-access-token", env = "TIBBER_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// Also save the fetched series for later replays.
    #[clap(long, env = "SERIES_FILE")]
    pub series_file: Option<PathBuf>,

    #[clap(flatten)]
    pub simulation: SimulationArgs,
}

#[derive(Parser)]
pub struct ReplayArgs {
    /// Series saved by `simulate --series-file`.
    #[clap(long, env = "SERIES_FILE")]
    pub series_file: PathBuf,

    #[clap(flatten)]
    pub simulation: SimulationArgs,
}

#[derive(Parser)]
pub struct SimulationArgs {
    /// Window start.
    #[clap(long, env = "SINCE", default_value = "2024-10-01T00:00:00Z")]
    pub since: DateTime<Utc>,

    /// Window end, inclusive.
    #[clap(long, env = "UNTIL", default_value = "2025-03-29T23:59:00Z")]
    pub until: DateTime<Utc>,

    /// Battery capacities to simulate, each one in a separate run.
    #[clap(
        long = "capacities-kilowatt-hours",
        env = "CAPACITIES_KILOWATT_HOURS",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "2,4,8,16,24",
    )]
    pub capacities: Vec<KilowattHours>,

    /// Maximum charging power in kilowatts.
    #[clap(
        long = "charging-power-kilowatts",
        env = "CHARGING_POWER_KILOWATTS",
        default_value = "12"
    )]
    pub charging_power: Kilowatts,

    /// Median of a day with an even number of hours.
    #[clap(long, env = "MEDIAN", default_value = "lower")]
    pub median: MedianConvention,

    /// Directory for the simulation reports.
    #[clap(long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Decimal separator in the reports.
    #[clap(long, env = "DECIMAL_SEPARATOR", default_value = ",")]
    pub decimal_separator: char,

    /// Also save the run totals into the TOML file.
    #[clap(long, env = "SUMMARY_FILE")]
    pub summary_file: Option<PathBuf>,
}

impl SimulationArgs {
    pub fn window(&self) -> Result<RangeInclusive<DateTime<Utc>>> {
        ensure!(self.since <= self.until, "the window starts after it ends");
        Ok(self.since..=self.until)
    }

    /// Build one simulator per capacity.
    pub fn simulators(&self) -> Result<Vec<Simulator>> {
        ensure!(self.charging_power >= Kilowatts::ZERO, "charging power must not be negative");
        // Each capacity has its own report file:
        ensure!(
            self.capacities.iter().sorted().dedup().count() == self.capacities.len(),
            "capacities must be unique",
        );
        self.capacities
            .iter()
            .map(|capacity| {
                ensure!(*capacity > KilowattHours::ZERO, "capacity must be positive: {capacity}");
                Ok(Simulator::builder()
                    .capacity(*capacity)
                    .charging_power(self.charging_power)
                    .median(self.median)
                    .build())
            })
            .collect()
    }

    pub const fn number_format(&self) -> NumberFormat {
        NumberFormat { decimal_separator: self.decimal_separator }
    }
}
