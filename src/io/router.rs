//! Driving route lookup via a GraphHopper-compatible routing API
//!
//! Mirrors the geocoder's soft-failure contract: transport errors, bad
//! payloads, and "no path between these points" all fold to `None`.
//! Distances are normalized to kilometers (the provider reports meters);
//! the returned path runs from `from` to `to` inclusive as (lon, lat) pairs.

use crate::domain::{Coordinates, RouteResult};
use crate::infra::Config;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Computes a drivable path between two points, or nothing
#[async_trait]
pub trait PlanRoute: Send + Sync {
    async fn route(&self, from: Coordinates, to: Coordinates) -> Option<RouteResult>;
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    paths: Vec<RoutePath>,
}

#[derive(Debug, Deserialize)]
struct RoutePath {
    /// Meters
    distance: f64,
    points: PointList,
}

#[derive(Debug, Deserialize)]
struct PointList {
    /// (lon, lat) pairs, provider order preserved
    coordinates: Vec<(f64, f64)>,
}

fn first_path(response: RouteResponse) -> Option<RouteResult> {
    response.paths.into_iter().next().map(|p| RouteResult {
        distance_km: p.distance / 1000.0,
        points: p.points.coordinates,
    })
}

pub struct GraphHopperRouter {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GraphHopperRouter {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.router_timeout_ms()))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: config.router_url().to_string(),
            api_key: config.router_api_key().to_string(),
        }
    }
}

#[async_trait]
impl PlanRoute for GraphHopperRouter {
    async fn route(&self, from: Coordinates, to: Coordinates) -> Option<RouteResult> {
        let from_point = format!("{},{}", from.lat, from.lon);
        let to_point = format!("{},{}", to.lat, to.lon);

        let response = match self
            .client
            .get(&self.url)
            .query(&[
                ("point", from_point.as_str()),
                ("point", to_point.as_str()),
                ("vehicle", "car"),
                ("points_encoded", "false"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(from = %from, to = %to, error = %e, "route_request_failed");
                return None;
            }
        };

        let body: RouteResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(from = %from, to = %to, error = %e, "route_response_invalid");
                return None;
            }
        };

        match first_path(body) {
            Some(route) => {
                debug!(
                    from = %from,
                    to = %to,
                    distance_km = %route.distance_km,
                    points = %route.points.len(),
                    "route_ok"
                );
                Some(route)
            }
            None => {
                warn!(from = %from, to = %to, "route_no_path");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_path_converts_meters_to_km() {
        let body = r#"{
            "paths": [{
                "distance": 12345.6,
                "points": {"coordinates": [[-21.9426, 64.1466], [-21.8954, 64.0671]]}
            }]
        }"#;
        let response: RouteResponse = serde_json::from_str(body).unwrap();
        let route = first_path(response).unwrap();
        assert!((route.distance_km - 12.3456).abs() < 1e-9);
        assert_eq!(route.points.len(), 2);
        assert_eq!(route.points[0], (-21.9426, 64.1466));
        assert_eq!(route.points[1], (-21.8954, 64.0671));
    }

    #[test]
    fn test_first_path_no_paths() {
        let response: RouteResponse = serde_json::from_str(r#"{"paths": []}"#).unwrap();
        assert!(first_path(response).is_none());
    }

    #[test]
    fn test_first_path_missing_paths_field() {
        let response: RouteResponse =
            serde_json::from_str(r#"{"message": "Cannot find point"}"#).unwrap();
        assert!(first_path(response).is_none());
    }
}
