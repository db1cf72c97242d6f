//! VotingAggregator - Per-idea ballots with optimistic versioning

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    ConflictError, EngineError, Idea, IdeaId, RecordKind, Result, Vote, VoteValue,
    VoterId,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ballot::{Ballot, VoteBreakdown, VoteOutcome};

/// Result of recording a vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub idea_id: IdeaId,
    pub outcome: VoteOutcome,
    /// Net tally after the vote
    pub tally: i64,
    /// Ballot version after the vote
    pub version: u64,
}

/// Voting aggregator
///
/// Ballots for different ideas never contend; the lock only guards the map.
#[derive(Debug, Clone, Default)]
pub struct VotingAggregator {
    ballots: Arc<RwLock<HashMap<IdeaId, Ballot>>>,
}

impl VotingAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<IdeaId, Ballot>>> {
        self.ballots
            .read()
            .map_err(|_| EngineError::Storage("Failed to acquire ballot read lock".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<IdeaId, Ballot>>> {
        self.ballots
            .write()
            .map_err(|_| EngineError::Storage("Failed to acquire ballot write lock".to_string()))
    }

    fn with_ballot<T>(&self, idea_id: &IdeaId, f: impl FnOnce(&Ballot) -> T) -> Result<T> {
        let ballots = self.read()?;
        Ok(match ballots.get(idea_id) {
            Some(ballot) => f(ballot),
            None => f(&Ballot::new()),
        })
    }

    // ========== Recording ==========

    /// Record a vote, replacing any earlier vote by the same voter
    pub fn record_vote(
        &self,
        idea_id: IdeaId,
        voter_id: VoterId,
        value: VoteValue,
        cast_at: DateTime<Utc>,
    ) -> Result<VoteReceipt> {
        self.record(Vote::new(idea_id, voter_id, value, cast_at))
    }

    pub fn record(&self, vote: Vote) -> Result<VoteReceipt> {
        let mut ballots = self.write()?;
        let idea_id = vote.idea_id.clone();
        let ballot = ballots.entry(idea_id.clone()).or_default();
        let outcome = ballot.apply(vote);

        Ok(VoteReceipt {
            idea_id,
            outcome,
            tally: ballot.tally(),
            version: ballot.version(),
        })
    }

    /// Record a vote only if the ballot is still at `expected_version`
    pub fn record_if(&self, vote: Vote, expected_version: u64) -> Result<VoteReceipt> {
        let mut ballots = self.write()?;
        let actual = ballots.get(&vote.idea_id).map_or(0, Ballot::version);
        if actual != expected_version {
            return Err(ConflictError {
                kind: RecordKind::Idea,
                id: vote.idea_id.to_string(),
                expected: expected_version,
                actual,
            }
            .into());
        }

        let idea_id = vote.idea_id.clone();
        let ballot = ballots.entry(idea_id.clone()).or_default();
        let outcome = ballot.apply(vote);

        Ok(VoteReceipt {
            idea_id,
            outcome,
            tally: ballot.tally(),
            version: ballot.version(),
        })
    }

    /// Replace an idea's ballot with one rebuilt from caller-supplied history
    pub fn load(&self, idea_id: &IdeaId, history: impl IntoIterator<Item = Vote>) -> Result<i64> {
        let history: Vec<Vote> = history.into_iter().collect();
        if let Some(stray) = history.iter().find(|v| &v.idea_id != idea_id) {
            return Err(EngineError::InvalidInput(format!(
                "vote for idea '{}' in history of idea '{}'",
                stray.idea_id, idea_id
            )));
        }

        let ballot = Ballot::from_history(history);
        let tally = ballot.tally();
        self.write()?.insert(idea_id.clone(), ballot);
        Ok(tally)
    }

    // ========== Queries ==========

    /// Net score of an idea; 0 when nobody has voted
    pub fn tally(&self, idea_id: &IdeaId) -> Result<i64> {
        self.with_ballot(idea_id, Ballot::tally)
    }

    pub fn version(&self, idea_id: &IdeaId) -> Result<u64> {
        self.with_ballot(idea_id, Ballot::version)
    }

    /// Current (deduplicated) votes, ordered by voter
    pub fn votes(&self, idea_id: &IdeaId) -> Result<Vec<Vote>> {
        self.with_ballot(idea_id, |b| b.votes().cloned().collect())
    }

    pub fn breakdown(&self, idea_id: &IdeaId) -> Result<VoteBreakdown> {
        self.with_ballot(idea_id, Ballot::breakdown)
    }

    /// True iff the tally reaches `threshold` and the idea is still open for review
    pub fn is_promotable(&self, idea: &Idea, threshold: i64) -> Result<bool> {
        Ok(idea.status.is_open_for_review() && self.tally(&idea.id)? >= threshold)
    }
}
