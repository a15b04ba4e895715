//! Business logic: the batch pipeline and single-route resolution

pub mod batch;
pub mod routes;

pub use batch::BatchRun;
pub use routes::resolve_route;
