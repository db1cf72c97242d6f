//! Repository port for ideas and engagements
//!
//! The engine never owns durable storage. The surrounding application
//! implements this trait over its own store; `in_memory` is the adapter
//! used for tests and for callers that hand the engine a snapshot.
//!
//! Every write names the version it was based on. `commit` checks all of
//! them and applies all writes, or none.

pub mod in_memory;

use shared::{Engagement, EngagementId, EngagementStatus, Idea, IdeaId, IdeaStatus, Result};

/// A single versioned write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write<T> {
    /// Insert a new record; fails with `Conflict` if the id exists
    Create(T),
    /// Replace a record currently stored at `expected_version`
    Update { record: T, expected_version: u64 },
}

impl<T> Write<T> {
    pub fn record(&self) -> &T {
        match self {
            Write::Create(record) => record,
            Write::Update { record, .. } => record,
        }
    }
}

/// Writes committed together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    pub ideas: Vec<Write<Idea>>,
    pub engagements: Vec<Write<Engagement>>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn idea(mut self, write: Write<Idea>) -> Self {
        self.ideas.push(write);
        self
    }

    pub fn engagement(mut self, write: Write<Engagement>) -> Self {
        self.engagements.push(write);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ideas.is_empty() && self.engagements.is_empty()
    }
}

/// Records as stored after a commit (updates carry their bumped version)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Committed {
    pub ideas: Vec<Idea>,
    pub engagements: Vec<Engagement>,
}

/// Pipeline Repository Trait
///
/// Methods take `&self`: implementations serialize their own writes so one
/// repository can be shared across threads.
pub trait PipelineRepository: Send + Sync {
    fn find_idea(&self, id: &IdeaId) -> Result<Option<Idea>>;

    fn find_engagement(&self, id: &EngagementId) -> Result<Option<Engagement>>;

    fn ideas_by_status(&self, status: IdeaStatus) -> Result<Vec<Idea>>;

    fn engagements_by_status(&self, status: EngagementStatus) -> Result<Vec<Engagement>>;

    /// Apply every write atomically
    ///
    /// Updates are stored with `expected_version + 1`. Any version mismatch
    /// or missing record fails the whole set and nothing is applied.
    fn commit(&self, writes: WriteSet) -> Result<Committed>;

    fn insert_idea(&self, idea: Idea) -> Result<Idea> {
        let mut committed = self.commit(WriteSet::new().idea(Write::Create(idea)))?;
        committed
            .ideas
            .pop()
            .ok_or_else(|| shared::EngineError::Storage("commit returned no idea".to_string()))
    }

    fn insert_engagement(&self, engagement: Engagement) -> Result<Engagement> {
        let mut committed = self.commit(WriteSet::new().engagement(Write::Create(engagement)))?;
        committed
            .engagements
            .pop()
            .ok_or_else(|| shared::EngineError::Storage("commit returned no engagement".to_string()))
    }
}
