//! Roster Rumble - Contest API
//!
//! HTTP service for the daily fantasy contest catalogue: admins create
//! contests, players browse them.
//!
//! # Architecture
//!
//! The application follows a layered architecture:
//! - **Handlers**: HTTP request handlers (thin layer)
//! - **Services**: Business logic, cache-aside reads and event publication
//! - **Repositories**: Database access
//! - **Models**: Domain models and DTOs

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

use axum::{Router, middleware::from_fn};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(handlers::routes())
        .layer(from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
