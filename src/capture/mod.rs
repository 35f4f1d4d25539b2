pub mod dms;
mod extraction;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod structs;
pub mod timestamp;

pub use extraction::{extract_capture_metadata, sniff_image};
