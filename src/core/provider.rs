use std::ops::RangeInclusive;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{core::record::HourlyRecord, prelude::*};

/// Source of the hourly consumption and price series.
#[async_trait]
pub trait SeriesProvider: Sync {
    /// Fetch the chronologically sorted records within the window.
    async fn get_series(
        &self,
        window: &RangeInclusive<DateTime<Utc>>,
    ) -> Result<Vec<HourlyRecord>>;
}
