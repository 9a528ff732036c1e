use std::ops::Mul;

use crate::quantity::{cost::Cost, energy::KilowattHours};

// Euro per kilowatt-hour.
quantity!(KilowattHourRate, "€/kWh");

impl Mul<KilowattHours> for KilowattHourRate {
    type Output = Cost;

    fn mul(self, rhs: KilowattHours) -> Self::Output {
        rhs * self
    }
}
