//! Address geocoding via an OpenCage-compatible lookup API
//!
//! The provider contract folds every failure into the same outcome: a
//! transport error, a malformed response, and a genuine zero-result lookup
//! all yield `None`. Callers treat `None` as "this address did not resolve"
//! and never see the underlying fault.

use crate::domain::Coordinates;
use crate::infra::Config;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Resolves a free-text address to coordinates, or nothing
#[async_trait]
pub trait Geocode: Send + Sync {
    async fn geocode(&self, address: &str) -> Option<Coordinates>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeMatch>,
}

#[derive(Debug, Deserialize)]
struct GeocodeMatch {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

/// Take the provider's first match, the same way an interactive lookup would
fn first_match(response: GeocodeResponse) -> Option<Coordinates> {
    response
        .results
        .into_iter()
        .next()
        .map(|m| Coordinates { lat: m.geometry.lat, lon: m.geometry.lng })
}

pub struct OpenCageGeocoder {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl OpenCageGeocoder {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.geocoder_timeout_ms()))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: config.geocoder_url().to_string(),
            api_key: config.geocoder_api_key().to_string(),
        }
    }
}

#[async_trait]
impl Geocode for OpenCageGeocoder {
    async fn geocode(&self, address: &str) -> Option<Coordinates> {
        let response = match self
            .client
            .get(&self.url)
            .query(&[("q", address), ("key", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(address = %address, error = %e, "geocode_request_failed");
                return None;
            }
        };

        let body: GeocodeResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(address = %address, error = %e, "geocode_response_invalid");
                return None;
            }
        };

        match first_match(body) {
            Some(coords) => {
                debug!(address = %address, coords = %coords, "geocode_ok");
                Some(coords)
            }
            None => {
                warn!(address = %address, "geocode_no_results");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_picks_first_result() {
        let body = r#"{
            "results": [
                {"geometry": {"lat": 64.1466, "lng": -21.9426}},
                {"geometry": {"lat": 51.5074, "lng": -0.1278}}
            ]
        }"#;
        let response: GeocodeResponse = serde_json::from_str(body).unwrap();
        let coords = first_match(response).unwrap();
        assert_eq!(coords.lat, 64.1466);
        assert_eq!(coords.lon, -21.9426);
    }

    #[test]
    fn test_first_match_empty_results() {
        let response: GeocodeResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(first_match(response).is_none());
    }

    #[test]
    fn test_missing_results_field_is_empty() {
        // Provider error payloads omit the results array entirely
        let response: GeocodeResponse = serde_json::from_str(r#"{"status": 402}"#).unwrap();
        assert!(first_match(response).is_none());
    }
}
