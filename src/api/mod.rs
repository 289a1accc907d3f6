//! REST API implementation.

pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use errors::ApiError;
pub use server::{build_router, run_server};
pub use state::AppState;
