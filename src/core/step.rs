use std::fmt::{Display, Formatter};

use crate::{
    core::record::HourlyRecord,
    quantity::{cost::Cost, energy::KilowattHours, rate::KilowattHourRate},
};

/// How the consumption of an hour got served by the battery.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Discharge {
    /// The battery covered the entire consumption.
    Full,

    /// The battery got drained down to the reserve, the rest came from the grid.
    Partial,

    /// The grid covered the entire consumption.
    Idle,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Note {
    #[default]
    None,

    Charged,
}

impl Display for Note {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Charged => write!(f, "charged"),
        }
    }
}

/// Single-hour simulation outcome.
#[derive(Copy, Clone, Debug, PartialEq)]
#[must_use]
pub struct Step {
    pub full_price: KilowattHourRate,

    pub real_consumption: KilowattHours,

    /// What the hour would have cost without any battery.
    pub real_cost: Cost,

    pub battery_level_before: KilowattHours,
    pub battery_level_after: KilowattHours,

    pub discharge: Discharge,
    pub battery_used: KilowattHours,

    pub grid_usage: KilowattHours,
    pub grid_cost: Cost,

    /// Cost of the consumption under the battery policy, zero when the battery covered it all.
    pub battery_cost: Cost,

    pub recharge_energy: KilowattHours,
    pub recharge_cost: Cost,

    /// Actually paid this hour: the recharge and the residual grid draw.
    pub total_cost: Cost,

    pub note: Note,
}

/// Input record together with its simulation outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationRecord {
    pub record: HourlyRecord,

    /// `None` when the record lacks any of the required fields.
    pub step: Option<Step>,
}
