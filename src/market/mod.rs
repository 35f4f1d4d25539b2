pub mod aggregation;
mod engine;
pub mod ranking;
pub mod sources;
pub mod structs;

pub use engine::{ListingSource, MarketEngine};
#[cfg(test)]
pub(crate) use engine::mock;
