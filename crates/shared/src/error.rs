//! Error types for the pipeline engine

use thiserror::Error;

/// Which kind of record an error is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Resource,
    Idea,
    Engagement,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RecordKind::Resource => "resource",
            RecordKind::Idea => "idea",
            RecordKind::Engagement => "engagement",
        })
    }
}

/// Error returned when a resource, idea or engagement id is unknown
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} '{id}' not found")]
pub struct NotFoundError {
    pub kind: RecordKind,
    pub id: String,
}

/// Error returned when the requested status is not reachable from the current one
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} transition from '{from}' to '{to}'. Allowed: [{}]", allowed.join(", "))]
pub struct InvalidTransitionError {
    pub kind: RecordKind,
    pub from: String,
    pub to: String,
    pub allowed: Vec<String>,
}

/// Error returned when the stored version advanced past the one the caller read
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Version conflict on {kind} '{id}': expected {expected}, found {actual}")]
pub struct ConflictError {
    pub kind: RecordKind,
    pub id: String,
    pub expected: u64,
    pub actual: u64,
}

/// Error returned when a vote-based promotion is requested for an idea that
/// is below threshold or no longer open for review
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Idea '{idea_id}' is not promotable on votes: tally {tally} against threshold {threshold} in status '{status}'")]
pub struct NotPromotableError {
    pub idea_id: String,
    pub tally: i64,
    pub threshold: i64,
    pub status: String,
}

/// General engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransitionError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    NotPromotable(#[from] NotPromotableError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EngineError {
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        NotFoundError {
            kind,
            id: id.into(),
        }
        .into()
    }

    /// A retry with a freshly read version may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, EngineError::InvalidTransition(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
