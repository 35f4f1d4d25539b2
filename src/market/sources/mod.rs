mod http;
mod synthetic;

pub use http::HttpListingSource;
pub use synthetic::SyntheticListingSource;
