use std::{fs, path::Path};

use serde::Serialize;

use crate::{core::Summary, prelude::*};

#[derive(Serialize)]
struct SummaryFile<'a> {
    runs: &'a [Summary],
}

pub fn render_summaries(summaries: &[Summary]) -> Result<String> {
    Ok(toml::to_string(&SummaryFile { runs: summaries })?)
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn save_summaries(summaries: &[Summary], path: &Path) -> Result {
    fs::write(path, render_summaries(summaries)?)
        .with_context(|| format!("failed to write `{}`", path.display()))?;
    info!(n_runs = summaries.len(), "saved the summary");
    Ok(())
}
