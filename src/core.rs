pub mod battery;
pub mod day_statistics;
pub mod provider;
pub mod record;
pub mod simulator;
pub mod step;
pub mod summary;

pub use self::{
    day_statistics::MedianConvention,
    provider::SeriesProvider,
    record::HourlyRecord,
    simulator::{RunResult, Simulator},
    summary::Summary,
};
