//! # Pipeline Registry
//!
//! In-memory index of resource skill profiles. Read-only from the engine's
//! point of view; administrators replace whole profiles.

mod competency_registry;

pub use competency_registry::CompetencyRegistry;
