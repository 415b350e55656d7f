//! Domain models
//!
//! This module contains all domain models used throughout the application.

pub mod contest;
pub mod event;

pub use contest::*;
pub use event::*;
