//! Database repositories
//!
//! Repositories handle all direct database interactions.

pub mod contest_repo;

pub use contest_repo::{ContestRepository, ContestStore, SqlParam, Statement};
