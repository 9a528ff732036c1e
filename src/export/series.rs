//! Raw series dump, so that the simulation can be replayed without calling the API.

use std::{
    fs::File,
    io::{BufReader, Read, Write},
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    core::{HourlyRecord, SeriesProvider},
    prelude::*,
};

pub fn write_series<W: Write>(records: &[HourlyRecord], writer: W) -> Result {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_series<R: Read>(reader: R) -> Result<Vec<HourlyRecord>> {
    csv::Reader::from_reader(reader)
        .into_deserialize()
        .enumerate()
        .map(|(index, record)| record.with_context(|| format!("failed to read record #{index}")))
        .collect()
}

#[instrument(skip_all, fields(path = %path.display(), n_records = records.len()))]
pub fn save_series(records: &[HourlyRecord], path: &Path) -> Result {
    let file = File::create(path)
        .with_context(|| format!("failed to create `{}`", path.display()))?;
    write_series(records, file).with_context(|| format!("failed to write `{}`", path.display()))?;
    info!("saved the series");
    Ok(())
}

/// Previously saved series file.
pub struct SeriesFile(pub PathBuf);

#[async_trait]
impl SeriesProvider for SeriesFile {
    #[instrument(skip_all, fields(path = %self.0.display()))]
    async fn get_series(
        &self,
        window: &RangeInclusive<DateTime<Utc>>,
    ) -> Result<Vec<HourlyRecord>> {
        let file = File::open(&self.0)
            .with_context(|| format!("failed to open `{}`", self.0.display()))?;
        let mut series = read_series(BufReader::new(file))
            .with_context(|| format!("failed to read `{}`", self.0.display()))?;
        series.retain(|record| record.from.is_some_and(|from| window.contains(&from)));
        info!(n_records = series.len(), "loaded");
        Ok(series)
    }
}
