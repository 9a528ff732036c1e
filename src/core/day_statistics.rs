use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;

use crate::{core::record::HourlyRecord, prelude::*, quantity::rate::KilowattHourRate};

/// Number of charging windows per calendar day.
pub const N_CHEAPEST_HOURS: usize = 2;

/// Which of the two middle prices is the median of an even-sized day.
///
/// Both conventions agree on odd-sized days.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum MedianConvention {
    /// Index `(n - 1) / 2` of the sorted prices.
    #[default]
    Lower,

    /// Index `n / 2` of the sorted prices.
    Upper,
}

impl MedianConvention {
    /// Index of the median in a sorted non-empty list of the specified length.
    #[must_use]
    pub const fn index(self, len: usize) -> usize {
        match self {
            Self::Lower => len.saturating_sub(1) / 2,
            Self::Upper => len / 2,
        }
    }
}

/// Whole-day knowledge needed to make the per-hour decisions.
#[derive(Clone, Debug, PartialEq)]
pub struct DayStatistics {
    /// Cheapest hours, in ascending price order, earliest first on ties.
    pub cheapest_hours: Vec<DateTime<Utc>>,

    pub median_price: KilowattHourRate,
}

impl DayStatistics {
    fn from_hours(hours: &[(DateTime<Utc>, KilowattHourRate)], median: MedianConvention) -> Self {
        let sorted_prices = hours.iter().map(|(_, price)| *price).sorted().collect_vec();
        let median_price = sorted_prices[median.index(sorted_prices.len())];
        let cheapest_hours = hours
            .iter()
            .sorted_by_key(|(_, price)| *price)
            .take(N_CHEAPEST_HOURS)
            .map(|(timestamp, _)| *timestamp)
            .collect();
        Self { cheapest_hours, median_price }
    }

    #[must_use]
    pub fn is_cheapest_hour(&self, timestamp: DateTime<Utc>) -> bool {
        self.cheapest_hours.contains(&timestamp)
    }

    /// Discharging pays off only above the median price.
    #[must_use]
    pub fn is_profitable(&self, price: KilowattHourRate) -> bool {
        price > self.median_price
    }
}

/// Day statistics keyed by the UTC calendar date.
#[derive(Debug, Default)]
pub struct DailyStatistics(HashMap<NaiveDate, DayStatistics>);

impl DailyStatistics {
    /// Group the priced hours by date and collect the statistics of each day.
    ///
    /// Hours with a missing timestamp or price component are left out.
    #[instrument(skip_all, level = Level::DEBUG, fields(n_records = records.len()))]
    pub fn collect(records: &[HourlyRecord], median: MedianConvention) -> Self {
        let days: HashMap<_, _> = records
            .iter()
            .filter_map(HourlyRecord::priced_at)
            .into_group_map_by(|(timestamp, _)| timestamp.date_naive())
            .into_iter()
            .map(|(date, hours)| (date, DayStatistics::from_hours(&hours, median)))
            .collect();
        debug!(n_days = days.len(), "collected");
        Self(days)
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&DayStatistics> {
        self.0.get(&date)
    }
}
