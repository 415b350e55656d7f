//! Contest listing and creation handlers

mod handler;
pub mod request;

pub use handler::*;
pub use request::*;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Contest routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(handler::list_contests).post(handler::create_contest))
}
