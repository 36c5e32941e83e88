//! Error types and handling for `PantryFinder`

use thiserror::Error;

/// Main error type for the `PantryFinder` application
#[derive(Error, Debug)]
pub enum PantryFinderError {
    /// Geocoding failed or returned nothing for the address
    #[error("Could not geocode address '{address}': {reason}")]
    UnresolvedAddress { address: String, reason: String },

    /// No tract polygon contains the location
    #[error("No census tract contains location ({latitude:.5}, {longitude:.5})")]
    UnmatchedLocation { latitude: f64, longitude: f64 },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Reference data errors
    #[error("Data error: {message}")]
    Data { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PantryFinderError {
    /// Create a new unresolved address error
    pub fn unresolved<A: Into<String>, R: Into<String>>(address: A, reason: R) -> Self {
        Self::UnresolvedAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a new unmatched location error
    #[must_use]
    pub fn unmatched(latitude: f64, longitude: f64) -> Self {
        Self::UnmatchedLocation {
            latitude,
            longitude,
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new data error
    pub fn data<S: Into<String>>(message: S) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PantryFinderError::UnresolvedAddress { .. } => {
                "Could not geocode your address. Please check it and try again.".to_string()
            }
            PantryFinderError::UnmatchedLocation { .. } => {
                "Your location is outside the area covered by the travel-time data.".to_string()
            }
            PantryFinderError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            PantryFinderError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            PantryFinderError::Data { .. } => {
                "Agency data could not be loaded. Please check the data files.".to_string()
            }
            PantryFinderError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
