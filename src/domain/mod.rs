//! Domain models - core business types and the event protocol
//!
//! This module contains the canonical data types used throughout the system:
//! - `RouteRecord` - the primary business entity, one persisted route
//! - `RouteResult` - the output of a routing call (distance + path)
//! - `Coordinates` - geocoded position
//! - `ProgressEvent` - one unit of the batch pipeline's streamed output

pub mod event;
pub mod types;

// Re-export commonly used types
pub use event::ProgressEvent;
pub use types::{Coordinates, RecordId, RouteRecord, RouteResult, RouteStats};
