//! External interfaces: geocoding, routing, persistence, HTTP

pub mod geocoder;
pub mod multipart;
pub mod router;
pub mod server;
pub mod store;

pub use geocoder::{Geocode, OpenCageGeocoder};
pub use router::{GraphHopperRouter, PlanRoute};
pub use server::{start_http_server, App};
pub use store::{RouteStore, StoreRoutes};
