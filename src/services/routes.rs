//! Single-route resolution shared by the create and update endpoints
//!
//! One-shot version of the batch pipeline's per-item work: geocode both
//! endpoints, then route between them. Same soft-failure model; `None`
//! means the caller reports "could not calculate route".

use crate::domain::RouteResult;
use crate::io::geocoder::Geocode;
use crate::io::router::PlanRoute;
use tracing::warn;

pub async fn resolve_route<G: Geocode, R: PlanRoute>(
    geocoder: &G,
    router: &R,
    start_address: &str,
    end_address: &str,
) -> Option<RouteResult> {
    let Some(start) = geocoder.geocode(start_address).await else {
        warn!(address = %start_address, "route_start_unresolved");
        return None;
    };
    let Some(end) = geocoder.geocode(end_address).await else {
        warn!(address = %end_address, "route_end_unresolved");
        return None;
    };

    router.route(start, end).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coordinates;
    use async_trait::async_trait;

    /// Geocoder fake that resolves everything except "Nowhere"
    struct StubGeocoder;

    #[async_trait]
    impl Geocode for StubGeocoder {
        async fn geocode(&self, address: &str) -> Option<Coordinates> {
            if address == "Nowhere" {
                None
            } else {
                Some(Coordinates { lat: 64.0, lon: -21.0 })
            }
        }
    }

    struct StubRouter {
        fail: bool,
    }

    #[async_trait]
    impl PlanRoute for StubRouter {
        async fn route(&self, from: Coordinates, to: Coordinates) -> Option<RouteResult> {
            if self.fail {
                return None;
            }
            Some(RouteResult {
                distance_km: 2.5,
                points: vec![(from.lon, from.lat), (to.lon, to.lat)],
            })
        }
    }

    #[tokio::test]
    async fn test_resolves_both_ends() {
        let route = resolve_route(&StubGeocoder, &StubRouter { fail: false }, "Home", "Work")
            .await
            .unwrap();
        assert_eq!(route.distance_km, 2.5);
        assert_eq!(route.points.len(), 2);
    }

    #[tokio::test]
    async fn test_unresolvable_endpoint() {
        assert!(
            resolve_route(&StubGeocoder, &StubRouter { fail: false }, "Nowhere", "Work")
                .await
                .is_none()
        );
        assert!(
            resolve_route(&StubGeocoder, &StubRouter { fail: false }, "Home", "Nowhere")
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_no_path() {
        assert!(resolve_route(&StubGeocoder, &StubRouter { fail: true }, "Home", "Work")
            .await
            .is_none());
    }
}
