//! # Pipeline Voting
//!
//! Tallies one-vote-per-voter-per-idea records into a net score and decides
//! promotion eligibility. Recording a vote never changes an idea's status.

mod ballot;
mod voting_aggregator;

pub use ballot::{Ballot, VoteBreakdown, VoteOutcome};
pub use voting_aggregator::{VoteReceipt, VotingAggregator};
