//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// SERVER DEFAULTS
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

/// Default time to wait for a pooled connection, in seconds
pub const DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// REDIS DEFAULTS
// =============================================================================

pub const DEFAULT_REDIS_HOST: &str = "localhost";

pub const DEFAULT_REDIS_PORT: u16 = 6379;

// =============================================================================
// AUTHENTICATION
// =============================================================================

/// Lifetime of tokens minted by the signature-verification endpoint
pub const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;

/// Prefix of the `Authorization` header value carrying a token
pub const BEARER_PREFIX: &str = "Bearer ";

/// User role identifiers
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const USER: &str = "user";
}

// =============================================================================
// CONTEST LISTING
// =============================================================================

/// Page returned when the client does not ask for one
pub const DEFAULT_PAGE: i64 = 1;

/// Page size returned when the client does not ask for one
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Largest page size a client may request; larger values are clamped
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Largest page number accepted; keeps the row offset far from `i64` overflow
pub const MAX_PAGE: i64 = 1_000_000;

// =============================================================================
// CACHE SETTINGS
// =============================================================================

/// Namespace of every cached contest list page
pub const CONTEST_CACHE_PREFIX: &str = "contests:";

/// Glob matching every cached contest list page
pub const CONTEST_CACHE_PATTERN: &str = "contests:*";

/// Time-to-live of a cached list page
pub const CONTEST_CACHE_TTL_SECS: u64 = 30;

/// Upper bound on one lazy connection attempt to the cache
pub const CACHE_CONNECT_TIMEOUT_MS: u64 = 1_000;

/// Reconnect attempts made by the connection manager before giving up
pub const CACHE_CONNECT_RETRIES: usize = 1;

/// Keys requested per SCAN round trip during invalidation
pub const CACHE_SCAN_BATCH: usize = 100;

// =============================================================================
// EVENTS
// =============================================================================

/// Fan-out exchange receiving contest domain events
pub const CONTEST_EVENTS_EXCHANGE: &str = "contest.events";

/// Routing key used for publishes; ignored by fan-out exchanges
pub const CONTEST_EVENTS_ROUTING_KEY: &str = "";

// =============================================================================
// SPORTS
// =============================================================================

/// Canonical sport vocabulary shared by contest creation and list filtering
pub mod sports {
    pub const FOOTBALL: &str = "football";
    pub const SOCCER: &str = "soccer";
    pub const BASKETBALL: &str = "basketball";
    pub const TENNIS: &str = "tennis";
    pub const BASEBALL: &str = "baseball";
    pub const CRICKET: &str = "cricket";
    pub const HOCKEY: &str = "hockey";
    pub const RUGBY: &str = "rugby";
    pub const VOLLEYBALL: &str = "volleyball";
    pub const GOLF: &str = "golf";

    /// All supported sports
    pub const ALL: &[&str] = &[
        FOOTBALL, SOCCER, BASKETBALL, TENNIS, BASEBALL, CRICKET, HOCKEY, RUGBY, VOLLEYBALL, GOLF,
    ];
}
