//! # Pipeline Engine
//!
//! Wires the competency registry, matching engine, voting aggregator,
//! pipeline state machine, follow-up detector and audit journal into one
//! service addressed by record id.
//!
//! ```text
//! submit idea -> votes -> promote -> engagement -> shortlist
//!                                         |
//!                           transitions driven by callers
//!
//! interactions -> follow-up scan -> signals
//! ```

mod pipeline_engine;

pub use pipeline_engine::PipelineEngine;

// Re-exports for embedding applications
pub use audit::{AuditEntry, AuditEventType, AuditStats};
pub use followup::{FollowUpSignal, SlaWindow};
pub use matching::{MatchBreakdown, RankedCandidate};
pub use pipeline::{
    Conversion, EngagementDraft, EngagementTransition, IdeaTransition,
    InMemoryPipelineRepository, PipelineRepository, PromotionBasis,
};
pub use voting::{VoteBreakdown, VoteOutcome, VoteReceipt};
