use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::quantity::{energy::KilowattHours, rate::KilowattHourRate};

/// Single hourly node as reported by the metering API.
///
/// Every field is optional: incomplete nodes are kept and simulated as invalid hours.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[must_use]
pub struct HourlyRecord {
    /// Inclusive start of the hour.
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,

    /// Exclusive end of the hour.
    #[serde(default, rename = "to")]
    pub till: Option<DateTime<Utc>>,

    #[serde(default, rename = "unitPrice")]
    pub unit_price: Option<KilowattHourRate>,

    /// Tax component of the unit price.
    #[serde(default, rename = "unitPriceVAT")]
    pub unit_price_vat: Option<KilowattHourRate>,

    #[serde(default)]
    pub consumption: Option<KilowattHours>,

    #[serde(default, rename = "consumptionUnit")]
    pub consumption_unit: Option<String>,
}

impl HourlyRecord {
    /// Unit price including the tax component.
    pub fn full_price(&self) -> Option<KilowattHourRate> {
        Some(self.unit_price? + self.unit_price_vat?)
    }

    /// Timestamp and full price, if both are known.
    ///
    /// This is all the day statistics need, consumption is irrelevant there.
    pub fn priced_at(&self) -> Option<(DateTime<Utc>, KilowattHourRate)> {
        Some((self.from?, self.full_price()?))
    }

    /// Extract the fields required by the simulation.
    ///
    /// Negative consumption is rejected as malformed.
    pub fn validate(&self) -> Option<ValidHour> {
        let (timestamp, full_price) = self.priced_at()?;
        let consumption =
            self.consumption.filter(|consumption| *consumption >= KilowattHours::ZERO)?;
        Some(ValidHour { timestamp, full_price, consumption })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ValidHour {
    pub timestamp: DateTime<Utc>,
    pub full_price: KilowattHourRate,
    pub consumption: KilowattHours,
}

impl ValidHour {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    use super::*;

    fn record() -> HourlyRecord {
        HourlyRecord {
            from: Utc.with_ymd_and_hms(2024, 10, 1, 22, 0, 0).single(),
            till: Utc.with_ymd_and_hms(2024, 10, 1, 23, 0, 0).single(),
            unit_price: Some(KilowattHourRate(0.2)),
            unit_price_vat: Some(KilowattHourRate(0.05)),
            consumption: Some(KilowattHours(1.5)),
            consumption_unit: Some("kWh".to_string()),
        }
    }

    #[test]
    fn test_full_price() {
        assert_abs_diff_eq!(record().full_price().unwrap().0, 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_validate_ok() {
        let hour = record().validate().unwrap();
        assert_eq!(hour.consumption, KilowattHours(1.5));
        assert_eq!(hour.date(), NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
    }

    #[test]
    fn test_validate_missing_fields() {
        assert!(HourlyRecord { from: None, ..record() }.validate().is_none());
        assert!(HourlyRecord { unit_price: None, ..record() }.validate().is_none());
        assert!(HourlyRecord { unit_price_vat: None, ..record() }.validate().is_none());
        assert!(HourlyRecord { consumption: None, ..record() }.validate().is_none());
    }

    #[test]
    fn test_validate_negative_consumption() {
        let record = HourlyRecord { consumption: Some(KilowattHours(-1.0)), ..record() };
        assert!(record.validate().is_none());
        assert!(record.priced_at().is_some());

        let record = HourlyRecord { consumption: Some(KilowattHours::ZERO), ..record };
        assert_eq!(record.validate().unwrap().consumption, KilowattHours::ZERO);
    }

    #[test]
    fn test_priced_without_consumption() {
        let record = HourlyRecord { consumption: None, ..record() };
        assert!(record.priced_at().is_some());
    }

    #[test]
    fn test_deserialize_tibber_node() {
        let record: HourlyRecord = serde_json::from_str(
            r#"{
                "from": "2024-10-02T00:00:00.000+02:00",
                "to": "2024-10-02T01:00:00.000+02:00",
                "unitPrice": 0.2113,
                "unitPriceVAT": 0.0423,
                "consumption": null,
                "consumptionUnit": "kWh"
            }"#,
        )
        .unwrap();
        assert_eq!(record.from, Utc.with_ymd_and_hms(2024, 10, 1, 22, 0, 0).single());
        assert_eq!(record.consumption, None);
        assert!(record.validate().is_none());
        assert_abs_diff_eq!(record.full_price().unwrap().0, 0.2536, epsilon = 1e-9);
    }
}
