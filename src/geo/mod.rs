//! Reverse geocoding and geographic helpers.
pub mod distance;
pub mod providers;
mod resolver;
pub mod structs;

pub use resolver::{
    DEGRADED_CONFIDENCE, DEGRADED_PROVIDER, GeocodingProvider, GeocodingStrategy,
    LocationResolver,
};
#[cfg(test)]
pub(crate) use resolver::mock;
