//! Shared domain types for the kbase project.

pub mod config;
pub mod geo;
pub mod indexnow;
pub mod license;
pub mod share;
pub mod timing;

mod errors;

pub use errors::{KbaseError, Result};
