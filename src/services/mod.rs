//! Business logic services

pub mod auth_service;
pub mod cache_service;
pub mod contest_service;
pub mod event_service;

pub use auth_service::{AuthClaims, AuthError, JwtManager};
pub use cache_service::{CacheError, CacheStore, RedisCache};
pub use contest_service::ContestService;
pub use event_service::{AmqpPublisher, EventPublisher, PublishError};
