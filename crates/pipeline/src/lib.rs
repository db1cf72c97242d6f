//! # Pipeline State Machine
//!
//! Owns the legal state graphs for Ideas and Engagements and applies
//! transitions against version-stamped records.
//!
//! ```text
//! Idea:        submitted -> under_review -> approved -> converted
//!                                       \-> rejected
//!
//! Engagement:  draft -> active <-> paused
//!              active -> completed
//!              draft | active | paused -> cancelled
//! ```
//!
//! - `graph`       - transition tables
//! - `repository`  - persistence port and the in-memory adapter
//! - `state_machine` - the service that validates and commits transitions

pub mod graph;
pub mod repository;
pub mod state_machine;

pub use graph::Lifecycle;
pub use repository::in_memory::InMemoryPipelineRepository;
pub use repository::{Committed, PipelineRepository, Write, WriteSet};
pub use state_machine::{
    Conversion, EngagementDraft, EngagementTransition, IdeaTransition, PipelineStateMachine,
    PromotionBasis, Transition,
};
