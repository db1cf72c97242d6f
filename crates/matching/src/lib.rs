//! # Pipeline Matching
//!
//! Stateless scorer: given an opportunity's requirement set and a pool of
//! resources, produces a deterministic ranked candidate list.

mod matching_engine;

pub use matching_engine::{MatchBreakdown, MatchingEngine, RankedCandidate, RequirementScore};
