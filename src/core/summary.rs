use serde::Serialize;

use crate::{
    core::step::Step,
    quantity::{cost::Cost, energy::KilowattHours},
};

/// Aggregates of a single capacity run.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[must_use]
pub struct Summary {
    #[serde(rename = "capacity_kilowatt_hours")]
    pub capacity: KilowattHours,

    /// What the entire series would have cost without any battery.
    pub total_cost_grid_only: Cost,

    pub total_cost_with_battery: Cost,

    #[serde(rename = "discharged_kilowatt_hours")]
    pub discharged: KilowattHours,

    #[serde(rename = "recharged_kilowatt_hours")]
    pub recharged: KilowattHours,

    pub n_invalid_records: usize,
}

impl Summary {
    pub const fn new(capacity: KilowattHours) -> Self {
        Self {
            capacity,
            total_cost_grid_only: Cost::ZERO,
            total_cost_with_battery: Cost::ZERO,
            discharged: KilowattHours::ZERO,
            recharged: KilowattHours::ZERO,
            n_invalid_records: 0,
        }
    }

    pub fn add_step(&mut self, step: &Step) {
        self.total_cost_grid_only += step.real_cost;
        self.total_cost_with_battery += step.battery_cost + step.recharge_cost;
        self.discharged += step.battery_used;
        self.recharged += step.recharge_energy;
    }

    pub const fn add_invalid(&mut self) {
        self.n_invalid_records += 1;
    }

    /// We expect that with the battery we pay less.
    pub fn savings(&self) -> Cost {
        self.total_cost_grid_only - self.total_cost_with_battery
    }
}
