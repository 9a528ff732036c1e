pub mod series;
pub mod simulation;
pub mod summary;
