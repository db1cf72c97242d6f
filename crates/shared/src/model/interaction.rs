//! Interaction - Append-only record of contact with a tracked entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// Kind of entity the follow-up detector watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Opportunity,
    Contact,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Opportunity => "opportunity",
            EntityType::Contact => "contact",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Email,
    Call,
    Meeting,
    Note,
    Other,
}

/// Something the follow-up detector should watch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEntity {
    pub id: EntityId,
    pub entity_type: EntityType,
}

impl TrackedEntity {
    pub fn new(id: EntityId, entity_type: EntityType) -> Self {
        Self { id, entity_type }
    }
}

/// Interaction record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub kind: InteractionKind,
    pub occurred_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(
        entity_id: EntityId,
        entity_type: EntityType,
        kind: InteractionKind,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id,
            entity_type,
            kind,
            occurred_at,
        }
    }
}
