//! # Pipeline Shared
//!
//! Common types used across all engine crates: identifiers, the record
//! types handed in by (and returned to) the surrounding application, error
//! types and configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod model;

// Re-exports
pub use config::*;
pub use error::*;
pub use ids::*;
pub use model::*;
