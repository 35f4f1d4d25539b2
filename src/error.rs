use std::time::Duration;
use thiserror::Error;

/// The primary error type for the property-analyzer crate.
///
/// Only construction can fail with this error. A running analysis never
/// propagates errors to its caller; see [`crate::PropertyAnalyzer::analyze`].
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("HTTP client construction failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unreadable asset: {0}")]
    Metadata(#[from] MetadataError),
}

/// Raised when an asset cannot be read as an image at all.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Image asset is empty")]
    EmptyAsset,

    #[error("Could not recognize the file format of {0}")]
    UnrecognizedFormat(String),

    #[error("Asset is not an image (detected {0})")]
    NotAnImage(String),
}

/// A failure of a single external provider. Always recovered by moving on to
/// the next provider in the chain.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Authentication rejected: {0}")]
    Unauthorized(String),

    #[error("Provider overloaded: {0}")]
    Overloaded(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Provider returned no results")]
    NoResults,

    #[error("Provider timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Classifies a non-success HTTP status the same way for every adapter.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Unauthorized(body),
            429 | 503 | 529 => Self::Overloaded(body),
            _ => Self::Api { status, body },
        }
    }

    #[must_use]
    pub const fn is_overloaded(&self) -> bool {
        matches!(self, Self::Overloaded(_))
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
