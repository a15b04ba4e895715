//! Shared types for the route tracker

use chrono::Utc;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Newtype wrapper for route record IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RecordId(pub i64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic coordinates (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

/// Output of a successful routing call: total distance plus the driven path.
///
/// Points are (lon, lat) pairs ordered from the path's start to its end,
/// both endpoints included.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub distance_km: f64,
    pub points: Vec<(f64, f64)>,
}

/// One persisted route. Created by the batch pipeline or the single-route
/// endpoints, immutable except through the update endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub start_address: String,
    pub end_address: String,
    pub distance_km: f64,
    /// Record timestamp, `%Y-%m-%d %H:%M:%S` UTC
    pub date: String,
    #[serde(default)]
    pub notes: String,
    /// (lon, lat) pairs; if non-empty, first is the path start and last the end
    pub route_points: Vec<(f64, f64)>,
}

impl RouteRecord {
    /// Build a record from a resolved route, dated now.
    pub fn from_route(
        start_address: &str,
        end_address: &str,
        route: RouteResult,
        notes: &str,
    ) -> Self {
        Self {
            id: None,
            start_address: start_address.to_string(),
            end_address: end_address.to_string(),
            distance_km: route.distance_km,
            date: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            notes: notes.to_string(),
            route_points: route.points,
        }
    }

    /// Serialize the path as a JSON array of [lon, lat] pairs for storage.
    pub fn points_json(&self) -> String {
        serde_json::to_string(&self.route_points)
            .expect("coordinate pair serialization should not fail")
    }

    /// Parse a stored path column. Null/empty/malformed columns yield an
    /// empty path rather than failing the whole row.
    pub fn points_from_json(raw: Option<&str>) -> Vec<(f64, f64)> {
        match raw {
            Some(s) if !s.is_empty() => serde_json::from_str(s).unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// Aggregate statistics over all stored routes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStats {
    pub total_routes: u64,
    pub total_distance_km: f64,
    pub average_distance_km: f64,
    /// (date, route count) in descending date order; goes over the wire as
    /// a JSON object keyed by date, entries in stored order
    #[serde(serialize_with = "daily_routes_as_map")]
    pub daily_routes: Vec<(String, u64)>,
}

fn daily_routes_as_map<S: Serializer>(
    daily: &[(String, u64)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(daily.len()))?;
    for (day, count) in daily {
        map.serialize_entry(day, count)?;
    }
    map.end()
}
