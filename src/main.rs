#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod core;
mod export;
mod prelude;
mod quantity;
mod tables;

use std::{fs, path::Path};

use clap::{Parser, crate_version};

use crate::{
    api::tibber,
    cli::{Args, Command, SimulationArgs},
    core::{SeriesProvider, Summary},
    export::{
        series::{SeriesFile, save_series},
        simulation::save_report,
        summary::save_summaries,
    },
    prelude::*,
    tables::build_summary_table,
};

#[tokio::main]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Simulate(args) => {
            let provider = tibber::Api::try_new(&args.access_token)?;
            run(&provider, &args.simulation, args.series_file.as_deref()).await?;
        }
        Command::Replay(args) => {
            run(&SeriesFile(args.series_file), &args.simulation, None).await?;
        }
    }

    info!("done!");
    Ok(())
}

/// Fetch the series once and simulate every configured capacity over it.
#[instrument(skip_all)]
async fn run(
    provider: &dyn SeriesProvider,
    args: &SimulationArgs,
    series_file: Option<&Path>,
) -> Result {
    let simulators = args.simulators()?;
    let series = provider.get_series(&args.window()?).await?;
    if series.is_empty() {
        warn!("no consumption data found");
        return Ok(());
    }
    info!(n_records = series.len(), "loaded the series");
    if let Some(path) = series_file {
        save_series(&series, path)?;
    }

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create `{}`", args.output_dir.display()))?;
    let summaries = simulators
        .iter()
        .map(|simulator| {
            let result = simulator.run(&series);
            save_report(&result, &args.output_dir, args.number_format())?;
            Ok(result.summary)
        })
        .collect::<Result<Vec<Summary>>>()?;

    println!("{}", build_summary_table(&summaries));
    if let Some(path) = &args.summary_file {
        save_summaries(&summaries, path)?;
    }
    Ok(())
}

