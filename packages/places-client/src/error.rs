use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlacesError>;

#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request exceeded the configured timeout.
    #[error("Places API request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Places API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The API answered but with a non-OK status field.
    #[error("Places API status {status}: {message}")]
    Status { status: String, message: String },

    #[error("no geocoding match for {0}")]
    NotFound(String),
}
