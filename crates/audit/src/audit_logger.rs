//! AuditLogger - Journal of pipeline engine decisions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Idea, engagement or tracked entity the event is about
    pub subject_id: String,
    pub success: bool,
    pub reason: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Types of audit events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    VoteRecorded,
    IdeaTransition,
    EngagementTransition,
    TransitionRejected,
    IdeaConverted,
    CandidatesRanked,
    FollowUpRaised,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::VoteRecorded => "vote_recorded",
            AuditEventType::IdeaTransition => "idea_transition",
            AuditEventType::EngagementTransition => "engagement_transition",
            AuditEventType::TransitionRejected => "transition_rejected",
            AuditEventType::IdeaConverted => "idea_converted",
            AuditEventType::CandidatesRanked => "candidates_ranked",
            AuditEventType::FollowUpRaised => "follow_up_raised",
        }
    }
}

/// Audit logger
///
/// Keeps at most `max_entries`; the oldest entry is dropped first.
#[derive(Debug)]
pub struct AuditLogger {
    entries: VecDeque<AuditEntry>,
    max_entries: usize,
}

impl AuditLogger {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries: max_entries.max(1),
        }
    }

    pub fn log(&mut self, entry: AuditEntry) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    fn record(
        &mut self,
        at: DateTime<Utc>,
        event_type: AuditEventType,
        subject_id: &str,
        reason: Option<String>,
        metadata: serde_json::Value,
    ) {
        self.log(AuditEntry {
            timestamp: at,
            event_type,
            subject_id: subject_id.to_string(),
            success: event_type != AuditEventType::TransitionRejected,
            reason,
            metadata: Some(metadata),
        });
    }

    /// Log a vote that changed (or first set) a voter's position
    pub fn log_vote(
        &mut self,
        idea_id: &str,
        voter_id: &str,
        value: i64,
        tally: i64,
        at: DateTime<Utc>,
    ) {
        self.record(
            at,
            AuditEventType::VoteRecorded,
            idea_id,
            None,
            serde_json::json!({ "voterId": voter_id, "value": value, "tally": tally }),
        );
    }

    /// Log an applied status change of an idea or engagement
    pub fn log_transition(
        &mut self,
        event_type: AuditEventType,
        subject_id: &str,
        from: &str,
        to: &str,
        at: DateTime<Utc>,
    ) {
        self.record(
            at,
            event_type,
            subject_id,
            Some(format!("{} -> {}", from, to)),
            serde_json::json!({ "from": from, "to": to }),
        );
    }

    /// Log a transition that was refused
    pub fn log_rejected(&mut self, subject_id: &str, to: &str, reason: &str, at: DateTime<Utc>) {
        self.record(
            at,
            AuditEventType::TransitionRejected,
            subject_id,
            Some(reason.to_string()),
            serde_json::json!({ "to": to }),
        );
    }

    pub fn log_conversion(&mut self, idea_id: &str, engagement_id: &str, at: DateTime<Utc>) {
        self.record(
            at,
            AuditEventType::IdeaConverted,
            idea_id,
            Some(format!("Converted into engagement '{}'", engagement_id)),
            serde_json::json!({ "engagementId": engagement_id }),
        );
    }

    pub fn log_ranking(
        &mut self,
        engagement_id: &str,
        pool_size: usize,
        candidates: usize,
        at: DateTime<Utc>,
    ) {
        self.record(
            at,
            AuditEventType::CandidatesRanked,
            engagement_id,
            None,
            serde_json::json!({ "poolSize": pool_size, "candidates": candidates }),
        );
    }

    pub fn log_follow_up(
        &mut self,
        entity_id: &str,
        entity_type: &str,
        window_index: i64,
        at: DateTime<Utc>,
    ) {
        self.record(
            at,
            AuditEventType::FollowUpRaised,
            entity_id,
            None,
            serde_json::json!({ "entityType": entity_type, "window": window_index }),
        );
    }

    /// Most recent first
    pub fn get_recent(&self, limit: usize) -> Vec<&AuditEntry> {
        self.entries.iter().rev().take(limit).collect()
    }

    /// Most recent failures first
    pub fn get_recent_failures(&self, limit: usize) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| !e.success)
            .take(limit)
            .collect()
    }

    pub fn get_stats(&self) -> AuditStats {
        let mut by_event_type = BTreeMap::new();
        for entry in &self.entries {
            *by_event_type
                .entry(entry.event_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        AuditStats {
            total_entries: self.entries.len(),
            failure_count: self.entries.iter().filter(|e| !e.success).count(),
            by_event_type,
        }
    }

    /// Export as JSON, oldest first
    pub fn export_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.entries).unwrap_or_default()
    }
}

/// Audit statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    pub total_entries: usize,
    pub failure_count: usize,
    pub by_event_type: BTreeMap<String, usize>,
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(10000)
    }
}
