//! Route tracker - address batch geocoding and route logging service
//!
//! Module structure:
//! - `domain/` - Core types (RouteRecord, Coordinates, ProgressEvent)
//! - `io/` - External interfaces (geocoder, router, SQLite store, HTTP)
//! - `services/` - Business logic (batch pipeline, route resolution)
//! - `infra/` - Infrastructure (Config)

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
