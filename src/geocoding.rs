//! Address geocoding
//!
//! Turns the free-text address a user typed into coordinates. The OpenCage
//! client is the production implementation; anything else implementing
//! [`Geocoder`] can stand in for it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::GeocodingConfig;
use crate::models::{Coordinates, UserLocation};
use crate::{PantryFinderError, Result};

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `address` to a single location.
    ///
    /// Fails with `UnresolvedAddress` when the provider errors or finds
    /// nothing.
    async fn geocode(&self, address: &str) -> Result<UserLocation>;
}

/// OpenCage forward geocoding client
pub struct OpenCageGeocoder {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenCageGeocoder {
    /// Create a client from explicit configuration. An API key is required.
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PantryFinderError::config(
                "Geocoding API key is missing. Set geocoding.api_key or PANTRYFINDER_GEOCODING__API_KEY.",
            )
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("PantryFinder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PantryFinderError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_url(&self, address: &str) -> String {
        format!(
            "{}/json?q={}&key={}&limit=1&no_annotations=1",
            self.base_url,
            urlencoding::encode(address),
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl Geocoder for OpenCageGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<UserLocation> {
        info!("Geocoding address: '{}'", address);
        let start_time = Instant::now();

        let response = self
            .client
            .get(self.request_url(address))
            .send()
            .await
            .map_err(|e| {
                warn!("Geocoding request failed: {}", e);
                PantryFinderError::unresolved(address, format!("request failed: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            PantryFinderError::unresolved(address, format!("failed to read response: {e}"))
        })?;

        if !status.is_success() {
            warn!("Geocoding provider answered HTTP {}", status);
            let reason = opencage::error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(PantryFinderError::unresolved(
                address,
                format!("HTTP {}: {reason}", status.as_u16()),
            ));
        }

        let location = opencage::parse_response(address, &body)?;

        debug!(
            "Geocoded '{}' to {} in {:.3}s",
            address,
            location.coordinates.format_coordinates(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(location)
    }
}

/// OpenCage API response structures
mod opencage {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct GeocodeResponse {
        #[serde(default)]
        pub results: Vec<GeocodeResult>,
        pub status: Option<Status>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodeResult {
        pub geometry: Geometry,
        pub formatted: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Geometry {
        pub lat: f64,
        pub lng: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Status {
        pub code: u16,
        pub message: String,
    }

    /// First result of a successful response body
    pub fn parse_response(address: &str, body: &str) -> Result<UserLocation> {
        let response: GeocodeResponse = serde_json::from_str(body).map_err(|e| {
            PantryFinderError::unresolved(address, format!("invalid provider response: {e}"))
        })?;

        if let Some(status) = &response.status {
            if status.code != 200 {
                return Err(PantryFinderError::unresolved(
                    address,
                    format!("provider status {}: {}", status.code, status.message),
                ));
            }
        }

        let first = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| PantryFinderError::unresolved(address, "no results"))?;

        let coordinates = Coordinates::new(first.geometry.lat, first.geometry.lng);
        if !coordinates.is_valid() {
            return Err(PantryFinderError::unresolved(
                address,
                "provider returned out-of-range coordinates",
            ));
        }

        let location = UserLocation::from(coordinates);
        Ok(match first.formatted {
            Some(label) => location.with_label(label),
            None => location,
        })
    }

    /// Provider error message from an error body, if it has one
    pub fn error_message(body: &str) -> Option<String> {
        serde_json::from_str::<GeocodeResponse>(body)
            .ok()
            .and_then(|response| response.status)
            .map(|status| status.message)
    }
}

/// What the user typed
#[derive(Debug, Clone, PartialEq)]
pub enum AddressInput {
    /// Coordinates (latitude, longitude), no geocoding needed
    Coordinates(f64, f64),
    /// Free-text street address
    Address(String),
}

/// Address input parsing utilities
pub struct AddressParser;

impl AddressParser {
    /// Parse user input into coordinates or an address
    pub fn parse(input: &str) -> Result<AddressInput> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PantryFinderError::validation("Address cannot be empty"));
        }

        if let Ok((lat, lon)) = Self::parse_coordinates(input) {
            return Ok(AddressInput::Coordinates(lat, lon));
        }

        Ok(AddressInput::Address(input.to_string()))
    }

    /// Parse coordinates from string like "35.7796,-78.6382" or "35.7796 -78.6382"
    fn parse_coordinates(input: &str) -> Result<(f64, f64)> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() != 2 {
            return Err(PantryFinderError::validation(
                "Coordinates must be in format 'lat,lon'",
            ));
        }

        let lat = parts[0]
            .parse::<f64>()
            .map_err(|_| PantryFinderError::validation(format!("Invalid latitude: {}", parts[0])))?;
        let lon = parts[1]
            .parse::<f64>()
            .map_err(|_| PantryFinderError::validation(format!("Invalid longitude: {}", parts[1])))?;

        if !Coordinates::new(lat, lon).is_valid() {
            return Err(PantryFinderError::validation(format!(
                "Coordinates out of range: {lat}, {lon}"
            )));
        }

        Ok((lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RALEIGH: &str = r#"{
        "results": [
            {
                "formatted": "123 Main Street, Raleigh, NC 27601, United States of America",
                "geometry": { "lat": 35.7796, "lng": -78.6382 }
            }
        ],
        "status": { "code": 200, "message": "OK" },
        "total_results": 1
    }"#;

    #[test]
    fn test_parse_response_first_result() {
        let location = opencage::parse_response("123 Main St", RALEIGH).unwrap();
        assert_eq!(location.latitude(), 35.7796);
        assert_eq!(location.longitude(), -78.6382);
        assert!(location.label.unwrap().starts_with("123 Main Street"));
    }

    #[test]
    fn test_parse_response_no_results() {
        let body = r#"{"results": [], "status": {"code": 200, "message": "OK"}}"#;
        let err = opencage::parse_response("nowhere", body).unwrap_err();
        assert!(matches!(err, PantryFinderError::UnresolvedAddress { .. }));
        assert!(err.to_string().contains("no results"));
    }

    #[test]
    fn test_parse_response_provider_error_status() {
        let body = r#"{"results": [], "status": {"code": 402, "message": "quota exceeded"}}"#;
        let err = opencage::parse_response("1 Elm St", body).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_parse_response_garbage() {
        let err = opencage::parse_response("1 Elm St", "<html>").unwrap_err();
        assert!(matches!(err, PantryFinderError::UnresolvedAddress { .. }));
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"status": {"code": 401, "message": "invalid API key"}}"#;
        assert_eq!(
            opencage::error_message(body).as_deref(),
            Some("invalid API key")
        );
        assert!(opencage::error_message("not json").is_none());
    }

    #[test]
    fn test_client_requires_api_key() {
        let err = OpenCageGeocoder::new(&GeocodingConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, PantryFinderError::Config { .. }));
    }

    #[test]
    fn test_request_url_encodes_address() {
        let config = GeocodingConfig {
            api_key: Some("test_key_123".to_string()),
            base_url: "https://geo.example.com/v1/".to_string(),
            timeout_seconds: 5,
        };
        let geocoder = OpenCageGeocoder::new(&config).unwrap();
        assert_eq!(
            geocoder.request_url("123 Main St, Raleigh"),
            "https://geo.example.com/v1/json?q=123%20Main%20St%2C%20Raleigh&key=test_key_123&limit=1&no_annotations=1"
        );
    }

    #[test]
    fn test_address_parser_coordinates() {
        assert_eq!(
            AddressParser::parse("35.7796,-78.6382").unwrap(),
            AddressInput::Coordinates(35.7796, -78.6382)
        );
        assert_eq!(
            AddressParser::parse(" 35.7796 -78.6382 ").unwrap(),
            AddressInput::Coordinates(35.7796, -78.6382)
        );
    }

    #[test]
    fn test_address_parser_out_of_range_is_address() {
        assert!(matches!(
            AddressParser::parse("91.0,8.0").unwrap(),
            AddressInput::Address(_)
        ));
        assert!(matches!(
            AddressParser::parse("46.0,-181.0").unwrap(),
            AddressInput::Address(_)
        ));
    }

    #[test]
    fn test_address_parser_addresses() {
        assert_eq!(
            AddressParser::parse("123 Main St, Raleigh, NC").unwrap(),
            AddressInput::Address("123 Main St, Raleigh, NC".to_string())
        );
        assert!(matches!(
            AddressParser::parse("27601").unwrap(),
            AddressInput::Address(_)
        ));
    }

    #[test]
    fn test_address_parser_empty() {
        let err = AddressParser::parse("   ").unwrap_err();
        assert!(matches!(err, PantryFinderError::Validation { .. }));
    }
}
