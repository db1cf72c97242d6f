//! PipelineStateMachine - Validates and commits lifecycle transitions
//!
//! Every mutating call takes the version the caller read. The version is
//! checked up front and again atomically at commit, so two callers racing
//! on the same stale version cannot both win: the loser gets `Conflict`
//! and is expected to re-read and retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    CompetencyKey, ConflictError, Engagement, EngagementId, EngagementStatus, EngineError, Idea,
    IdeaId, IdeaStatus, NotPromotableError, RecordKind, Result,
};
use std::collections::BTreeSet;

use crate::graph::{promotion_step, Lifecycle};
use crate::repository::{PipelineRepository, Write, WriteSet};

/// An applied transition and the record as now stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition<T, S> {
    pub record: T,
    pub from: S,
    pub to: S,
}

pub type IdeaTransition = Transition<Idea, IdeaStatus>;
pub type EngagementTransition = Transition<Engagement, EngagementStatus>;

/// Shape of the engagement created when an idea is converted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementDraft {
    /// Generated (UUID v4) when absent
    #[serde(default)]
    pub id: Option<EngagementId>,
    pub client_ref: String,
    #[serde(default)]
    pub requirements: BTreeSet<CompetencyKey>,
}

impl EngagementDraft {
    pub fn new(client_ref: impl Into<String>) -> Self {
        Self {
            id: None,
            client_ref: client_ref.into(),
            requirements: BTreeSet::new(),
        }
    }

    pub fn with_id(mut self, id: EngagementId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_requirement(mut self, category: impl Into<String>, label: impl Into<String>) -> Self {
        self.requirements.insert(CompetencyKey::new(category, label));
        self
    }
}

/// Why an idea is being promoted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromotionBasis {
    /// Peer votes reached the threshold
    Votes { tally: i64, threshold: i64 },
    /// Explicit override, bypassing voting
    Manual { actor: String },
}

/// Result of converting an idea into an engagement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub idea: Idea,
    pub engagement: Engagement,
    /// Idea statuses passed through, starting with the status it was read in
    pub path: Vec<IdeaStatus>,
}

/// Pipeline state machine over a repository
#[derive(Debug, Clone)]
pub struct PipelineStateMachine<R> {
    repo: R,
}

impl<R: PipelineRepository> PipelineStateMachine<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    // ========== Lookups ==========

    pub fn idea(&self, id: &IdeaId) -> Result<Idea> {
        self.repo
            .find_idea(id)?
            .ok_or_else(|| EngineError::not_found(RecordKind::Idea, id.as_str()))
    }

    pub fn engagement(&self, id: &EngagementId) -> Result<Engagement> {
        self.repo
            .find_engagement(id)?
            .ok_or_else(|| EngineError::not_found(RecordKind::Engagement, id.as_str()))
    }

    // ========== Creation ==========

    /// Create a new submitted idea with a generated id
    pub fn submit_idea(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Idea> {
        let id = IdeaId::new(uuid::Uuid::new_v4().to_string());
        self.repo.insert_idea(Idea::new(id, title, description, now))
    }

    /// Register an idea read from the caller's store
    pub fn register_idea(&self, idea: Idea) -> Result<Idea> {
        self.repo.insert_idea(idea)
    }

    /// Register an engagement read from the caller's store
    pub fn register_engagement(&self, engagement: Engagement) -> Result<Engagement> {
        self.repo.insert_engagement(engagement)
    }

    // ========== Transitions ==========

    pub fn transition_idea(
        &self,
        id: &IdeaId,
        to: IdeaStatus,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<IdeaTransition> {
        let mut idea = self.idea(id)?;
        ensure_version(RecordKind::Idea, id.as_str(), expected_version, idea.version)?;
        let from = idea.status;
        from.check_transition(to)?;
        if to == IdeaStatus::Converted {
            // Conversion must create the engagement in the same write
            return Err(EngineError::InvalidInput(format!(
                "idea '{}' must be converted with convert_idea",
                id
            )));
        }

        idea.status = to;
        idea.updated_at = now;
        let mut committed = self.repo.commit(WriteSet::new().idea(Write::Update {
            record: idea,
            expected_version,
        }))?;

        let record = committed
            .ideas
            .pop()
            .ok_or_else(|| EngineError::Storage("commit returned no idea".to_string()))?;
        Ok(Transition { record, from, to })
    }

    pub fn transition_engagement(
        &self,
        id: &EngagementId,
        to: EngagementStatus,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<EngagementTransition> {
        let mut engagement = self.engagement(id)?;
        ensure_version(
            RecordKind::Engagement,
            id.as_str(),
            expected_version,
            engagement.version,
        )?;
        let from = engagement.status;
        from.check_transition(to)?;

        engagement.status = to;
        engagement.updated_at = now;
        let mut committed = self.repo.commit(WriteSet::new().engagement(Write::Update {
            record: engagement,
            expected_version,
        }))?;

        let record = committed
            .engagements
            .pop()
            .ok_or_else(|| EngineError::Storage("commit returned no engagement".to_string()))?;
        Ok(Transition { record, from, to })
    }

    /// Convert an approved idea, creating its draft engagement in the same write
    pub fn convert_idea(
        &self,
        id: &IdeaId,
        expected_version: u64,
        draft: EngagementDraft,
        now: DateTime<Utc>,
    ) -> Result<Conversion> {
        let idea = self.idea(id)?;
        ensure_version(RecordKind::Idea, id.as_str(), expected_version, idea.version)?;
        idea.status.check_transition(IdeaStatus::Converted)?;

        self.commit_conversion(idea, expected_version, vec![IdeaStatus::Approved], draft, now)
    }

    /// Walk an idea along the approving branch to `converted` in one write
    ///
    /// A vote-based basis must meet its threshold and the idea must still be
    /// `submitted` or `under_review`. A manual basis bypasses voting and also
    /// accepts an `approved` idea.
    pub fn promote_idea(
        &self,
        id: &IdeaId,
        expected_version: u64,
        basis: &PromotionBasis,
        draft: EngagementDraft,
        now: DateTime<Utc>,
    ) -> Result<Conversion> {
        let idea = self.idea(id)?;
        ensure_version(RecordKind::Idea, id.as_str(), expected_version, idea.version)?;

        if let PromotionBasis::Votes { tally, threshold } = basis {
            if tally < threshold || !idea.status.is_open_for_review() {
                return Err(NotPromotableError {
                    idea_id: id.to_string(),
                    tally: *tally,
                    threshold: *threshold,
                    status: idea.status.to_string(),
                }
                .into());
            }
        }

        let mut path = Vec::new();
        let mut current = idea.status;
        loop {
            let next = match promotion_step(current) {
                Some(next) => next,
                None => {
                    // Terminal without a way to conversion
                    current.check_transition(IdeaStatus::Converted)?;
                    return Err(EngineError::Storage(format!(
                        "no promotion step defined from '{}'",
                        current
                    )));
                }
            };
            current.check_transition(next)?;
            path.push(current);
            if next == IdeaStatus::Converted {
                break;
            }
            current = next;
        }

        self.commit_conversion(idea, expected_version, path, draft, now)
    }

    fn commit_conversion(
        &self,
        mut idea: Idea,
        expected_version: u64,
        path: Vec<IdeaStatus>,
        draft: EngagementDraft,
        now: DateTime<Utc>,
    ) -> Result<Conversion> {
        let engagement_id = draft
            .id
            .unwrap_or_else(|| EngagementId::new(uuid::Uuid::new_v4().to_string()));
        let mut engagement =
            Engagement::new(engagement_id.clone(), draft.client_ref, draft.requirements, now);
        engagement.source_idea = Some(idea.id.clone());

        idea.status = IdeaStatus::Converted;
        idea.engagement_id = Some(engagement_id);
        idea.updated_at = now;

        let mut committed = self.repo.commit(
            WriteSet::new()
                .idea(Write::Update {
                    record: idea,
                    expected_version,
                })
                .engagement(Write::Create(engagement)),
        )?;

        match (committed.ideas.pop(), committed.engagements.pop()) {
            (Some(idea), Some(engagement)) => Ok(Conversion {
                idea,
                engagement,
                path,
            }),
            _ => Err(EngineError::Storage(
                "conversion commit returned incomplete records".to_string(),
            )),
        }
    }
}

fn ensure_version(kind: RecordKind, id: &str, expected: u64, actual: u64) -> Result<()> {
    if expected == actual {
        return Ok(());
    }
    Err(ConflictError {
        kind,
        id: id.to_string(),
        expected,
        actual,
    }
    .into())
}
