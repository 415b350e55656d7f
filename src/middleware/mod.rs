//! HTTP middleware

pub mod auth;
pub mod logging;

pub use auth::{AdminUser, bearer_token};
pub use logging::logging_middleware;
