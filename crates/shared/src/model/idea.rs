//! Idea - A proposed initiative subject to peer voting
//!
//! Ideas are created by any user. Their status changes only through the
//! pipeline state machine; votes never touch it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EngagementId, IdeaId};

/// Lifecycle status of an Idea
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Converted,
}

impl IdeaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::Submitted => "submitted",
            IdeaStatus::UnderReview => "under_review",
            IdeaStatus::Approved => "approved",
            IdeaStatus::Rejected => "rejected",
            IdeaStatus::Converted => "converted",
        }
    }

    /// Still collecting votes: the only statuses a vote-based promotion accepts
    pub fn is_open_for_review(&self) -> bool {
        matches!(self, IdeaStatus::Submitted | IdeaStatus::UnderReview)
    }
}

impl std::fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Idea record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: IdeaId,
    pub title: String,
    pub description: String,
    pub status: IdeaStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency stamp, starts at 1
    pub version: u64,
    /// Set once the idea has been converted
    #[serde(default)]
    pub engagement_id: Option<EngagementId>,
}

impl Idea {
    /// Create a freshly submitted idea
    pub fn new(
        id: IdeaId,
        title: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            status: IdeaStatus::Submitted,
            created_at,
            updated_at: created_at,
            version: 1,
            engagement_id: None,
        }
    }
}
