//! Utility functions

pub mod time;
pub mod validation;

pub use time::parse_datetime;
pub use validation::{FieldViolation, normalize_sport, validate_sport};
