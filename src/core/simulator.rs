use bon::Builder;
use chrono::TimeDelta;

use crate::{
    core::{
        battery::Battery,
        day_statistics::{DailyStatistics, DayStatistics, MedianConvention},
        record::{HourlyRecord, ValidHour},
        step::{Discharge, Note, SimulationRecord, Step},
        summary::Summary,
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours, power::Kilowatts},
};

/// Greedy battery policy: recharge in the cheapest hours of a day,
/// discharge only while the price is above the day's median.
#[derive(Builder)]
#[must_use]
pub struct Simulator {
    capacity: KilowattHours,

    /// Maximum charging power, applied for one hour.
    charging_power: Kilowatts,

    #[builder(default)]
    median: MedianConvention,
}

impl Simulator {
    /// Partial discharges never go below this.
    pub const MIN_RESERVE: KilowattHours = KilowattHours(2.0);

    /// Reserve as a fraction of the capacity.
    pub const RESERVE_RATIO: f64 = 0.2;

    /// Reserve floor scaled to the capacity.
    pub fn dynamic_minimum(&self) -> KilowattHours {
        (self.capacity * Self::RESERVE_RATIO).max(Self::MIN_RESERVE)
    }

    fn max_recharge(&self) -> KilowattHours {
        self.charging_power * TimeDelta::hours(1)
    }

    /// Simulate the battery over the chronologically sorted series.
    ///
    /// Each call starts from a full battery, so runs are independent of each other.
    #[instrument(skip_all, fields(capacity = %self.capacity, n_records = records.len()))]
    pub fn run(&self, records: &[HourlyRecord]) -> RunResult {
        let statistics = DailyStatistics::collect(records, self.median);
        let mut battery = Battery::full(self.capacity);
        let mut summary = Summary::new(self.capacity);

        let records = records
            .iter()
            .map(|record| {
                let step = if let Some(hour) = record.validate() {
                    let step = self.step(&mut battery, &hour, statistics.get(hour.date()));
                    summary.add_step(&step);
                    Some(step)
                } else {
                    warn!(from = ?record.from, "invalid record, skipping");
                    summary.add_invalid();
                    None
                };
                SimulationRecord { record: record.clone(), step }
            })
            .collect();

        info!(
            grid_only = %summary.total_cost_grid_only,
            with_battery = %summary.total_cost_with_battery,
            savings = %summary.savings(),
            "simulated",
        );
        RunResult { records, summary }
    }

    fn step(&self, battery: &mut Battery, hour: &ValidHour, day: Option<&DayStatistics>) -> Step {
        let battery_level_before = battery.level;

        // A day without statistics has no profitable and no cheapest hours:
        let is_profitable = day.is_some_and(|day| day.is_profitable(hour.full_price));
        let is_cheapest_hour = day.is_some_and(|day| day.is_cheapest_hour(hour.timestamp));

        let dynamic_minimum = self.dynamic_minimum();
        let (discharge, battery_used) = if is_profitable && battery.level >= hour.consumption {
            (Discharge::Full, hour.consumption)
        } else if is_profitable && battery.level > dynamic_minimum {
            (Discharge::Partial, hour.consumption.min(battery.level - dynamic_minimum))
        } else {
            (Discharge::Idle, KilowattHours::ZERO)
        };
        battery.discharge(battery_used);

        let grid_usage = hour.consumption - battery_used;
        let grid_cost = grid_usage * hour.full_price;
        let battery_cost = match discharge {
            Discharge::Full => Cost::ZERO,
            Discharge::Partial | Discharge::Idle => grid_cost,
        };

        let (recharge_energy, note) = if is_cheapest_hour && !battery.is_full() {
            (self.max_recharge().min(battery.headroom()), Note::Charged)
        } else {
            (KilowattHours::ZERO, Note::None)
        };
        battery.charge(recharge_energy);
        let recharge_cost = recharge_energy * hour.full_price;
        if note == Note::Charged {
            debug!(at = %hour.timestamp, energy = %recharge_energy, cost = %recharge_cost, "recharged");
        }

        trace!(
            at = %hour.timestamp,
            ?discharge,
            battery_used = %battery_used,
            level = %battery.level,
            "stepped",
        );
        Step {
            full_price: hour.full_price,
            real_consumption: hour.consumption,
            real_cost: hour.consumption * hour.full_price,
            battery_level_before,
            battery_level_after: battery.level,
            discharge,
            battery_used,
            grid_usage,
            grid_cost,
            battery_cost,
            recharge_energy,
            recharge_cost,
            total_cost: recharge_cost + grid_cost,
            note,
        }
    }
}

/// Outcome of a single capacity run.
#[derive(Clone, Debug, PartialEq)]
#[must_use]
pub struct RunResult {
    /// One per input record, in the input order.
    pub records: Vec<SimulationRecord>,

    pub summary: Summary,
}
