//! HTTP surface.
//!
//! Handlers validate at the boundary, hand the record to the orchestrator on
//! the blocking pool, then render and persist.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;
pub mod validation;

pub use router::api_router;
pub use server::{serve_until_ctrl_c, start_server, ApiServer, ServerError};
pub use types::ApiContext;
