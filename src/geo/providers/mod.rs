mod google;
mod nominatim;
mod offline;

pub use google::GoogleGeocoder;
pub use nominatim::NominatimGeocoder;
pub use offline::OfflineGeocoder;
