//! Error types shared by the fetch, store and reconciliation layers.

use thiserror::Error;

/// Failure talking to the weather / geocoding API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse {what} response: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure reading or writing the local city store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database connection lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("City not found: {0}")]
    NotFound(i64),
}

impl WeatherError {
    /// Short message suitable for a transient notice in the UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCoordinates { .. } => "That location is not valid".to_string(),
            Self::Fetch(FetchError::Network(_)) => {
                "Network error. Check your connection.".to_string()
            }
            Self::Fetch(FetchError::Status { status: 401, .. }) => {
                "The weather service rejected the API key".to_string()
            }
            Self::Fetch(_) => "Weather service is unavailable right now".to_string(),
            Self::Store(_) => "Local storage error".to_string(),
            Self::NotFound(_) => "City not found".to_string(),
        }
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch(FetchError::Network(_)) => true,
            Self::Fetch(FetchError::Status { status, .. }) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
