//! Data model - The records the engine reads and returns
//!
//! The surrounding application owns persistence. These are plain data
//! records that derive serde so the caller can store whatever the engine
//! hands back.

pub mod competency;
pub mod engagement;
pub mod idea;
pub mod interaction;
pub mod vote;

pub use competency::{Competency, CompetencyKey, CompetencySet, Proficiency, Resource};
pub use engagement::{Engagement, EngagementStatus};
pub use idea::{Idea, IdeaStatus};
pub use interaction::{EntityType, Interaction, InteractionKind, TrackedEntity};
pub use vote::{Vote, VoteValue};
