//! # Conveyor REST
//!
//! The HTTP control plane: thin axum handlers over the job service, an
//! error-to-status mapping for the taxonomy, and handler-scope panic
//! containment.

pub mod controllers;
pub mod responses;
pub mod router;
pub mod state;

pub use responses::ApiError;
pub use router::create_router;
pub use state::AppState;
