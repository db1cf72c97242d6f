//! Engagement - A unit of trackable work with a bounded lifecycle
//!
//! "Opportunity" and "engagement" name the same record at different points
//! of its life; the engine uses one type for both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::competency::CompetencyKey;
use crate::ids::{EngagementId, IdeaId};

/// Lifecycle status of an Engagement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl EngagementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementStatus::Draft => "draft",
            EngagementStatus::Active => "active",
            EngagementStatus::Paused => "paused",
            EngagementStatus::Completed => "completed",
            EngagementStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for EngagementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engagement record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub id: EngagementId,
    pub client_ref: String,
    /// Required competencies; each is a minimum bar with no level attached
    #[serde(default)]
    pub requirements: BTreeSet<CompetencyKey>,
    pub status: EngagementStatus,
    /// Optimistic concurrency stamp, starts at 1
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The idea this engagement was converted from, if any
    #[serde(default)]
    pub source_idea: Option<IdeaId>,
}

impl Engagement {
    /// Create a draft engagement
    pub fn new(
        id: EngagementId,
        client_ref: impl Into<String>,
        requirements: impl IntoIterator<Item = CompetencyKey>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_ref: client_ref.into(),
            requirements: requirements.into_iter().collect(),
            status: EngagementStatus::Draft,
            version: 1,
            created_at,
            updated_at: created_at,
            source_idea: None,
        }
    }
}
