//! Ballot - The current votes on one idea
//!
//! A later vote by the same voter replaces the earlier one. A vote carrying
//! an older timestamp than the one already held is stale and ignored; equal
//! timestamps resolve to the last write.

use serde::{Deserialize, Serialize};
use shared::{Vote, VoteValue, VoterId};
use std::collections::BTreeMap;

/// What recording a vote did to the ballot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    /// First vote from this voter
    Recorded,
    /// Replaced this voter's earlier vote
    Replaced,
    /// Older than the vote already held; ballot unchanged
    Stale,
}

/// Up/neutral/down counts of the current votes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteBreakdown {
    pub up: usize,
    pub neutral: usize,
    pub down: usize,
    pub net: i64,
}

/// Deduplicated votes on a single idea
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ballot {
    votes: BTreeMap<VoterId, Vote>,
    /// Bumped on every accepted vote; 0 for an untouched ballot
    version: u64,
}

impl Ballot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ballot from a vote history
    ///
    /// Order does not matter while each voter's timestamps are distinct;
    /// votes sharing a timestamp resolve to the one applied last.
    pub fn from_history(history: impl IntoIterator<Item = Vote>) -> Self {
        let mut ballot = Self::new();
        for vote in history {
            ballot.apply(vote);
        }
        ballot
    }

    pub fn apply(&mut self, vote: Vote) -> VoteOutcome {
        let outcome = match self.votes.get(&vote.voter_id) {
            Some(current) if vote.cast_at < current.cast_at => return VoteOutcome::Stale,
            Some(_) => VoteOutcome::Replaced,
            None => VoteOutcome::Recorded,
        };
        self.votes.insert(vote.voter_id.clone(), vote);
        self.version += 1;
        outcome
    }

    /// Net score: sum of current vote values
    pub fn tally(&self) -> i64 {
        self.votes.values().map(|v| v.value.as_i64()).sum()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Current votes ordered by voter id
    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn breakdown(&self) -> VoteBreakdown {
        let mut breakdown = VoteBreakdown::default();
        for vote in self.votes.values() {
            match vote.value {
                VoteValue::Up => breakdown.up += 1,
                VoteValue::Neutral => breakdown.neutral += 1,
                VoteValue::Down => breakdown.down += 1,
            }
        }
        breakdown.net = self.tally();
        breakdown
    }
}
