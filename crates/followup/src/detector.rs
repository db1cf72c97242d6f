//! FollowUpDetector - Staleness evaluation over interaction history
//!
//! `elapsed = now - last interaction`. An entity is stale once `elapsed`
//! exceeds the threshold for its type; its SLA window index is
//! `elapsed / threshold`. The window is anchored on the last interaction,
//! so renewed contact starts a fresh series of windows. An entity never
//! contacted is always stale and sits in window 0 with no anchor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{EntityId, EntityType, Interaction, SlaThresholds, TrackedEntity};
use std::collections::HashMap;

use crate::ledger::SignalLedger;

/// SLA window an entity is stale in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaWindow {
    /// Last interaction the window is measured from; `None` if never contacted
    pub anchor: Option<DateTime<Utc>>,
    pub index: i64,
}

/// "Needs follow-up" signal for downstream notification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpSignal {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub raised_at: DateTime<Utc>,
    pub window: SlaWindow,
}

/// Result of evaluating one stale entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staleness {
    pub entity: TrackedEntity,
    pub last_interaction: Option<DateTime<Utc>>,
    pub window: SlaWindow,
}

impl Staleness {
    fn into_signal(self, raised_at: DateTime<Utc>) -> FollowUpSignal {
        FollowUpSignal {
            entity_id: self.entity.id,
            entity_type: self.entity.entity_type,
            raised_at,
            window: self.window,
        }
    }
}

/// Most recent interaction per entity, ignoring anything after `now`
fn last_interactions<'a>(
    interactions: impl IntoIterator<Item = &'a Interaction>,
    now: DateTime<Utc>,
) -> HashMap<(&'a EntityId, EntityType), DateTime<Utc>> {
    let mut latest: HashMap<(&EntityId, EntityType), DateTime<Utc>> = HashMap::new();
    for interaction in interactions {
        if interaction.occurred_at > now {
            continue;
        }
        latest
            .entry((&interaction.entity_id, interaction.entity_type))
            .and_modify(|t| *t = (*t).max(interaction.occurred_at))
            .or_insert(interaction.occurred_at);
    }
    latest
}

/// Follow-up detector
#[derive(Debug, Clone, Default)]
pub struct FollowUpDetector {
    thresholds: SlaThresholds,
}

impl FollowUpDetector {
    pub fn new(thresholds: SlaThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SlaThresholds {
        &self.thresholds
    }

    /// Stale entities and their current windows, in input order
    ///
    /// Pure: no ledger involved, safe to run in parallel over disjoint
    /// entity sets.
    pub fn evaluate(
        &self,
        entities: &[TrackedEntity],
        interactions: &[Interaction],
        now: DateTime<Utc>,
    ) -> Vec<Staleness> {
        let latest = last_interactions(interactions, now);

        entities
            .iter()
            .filter_map(|entity| {
                let last = latest.get(&(&entity.id, entity.entity_type)).copied();
                let window = self.window_for(entity.entity_type, last, now)?;
                Some(Staleness {
                    entity: entity.clone(),
                    last_interaction: last,
                    window,
                })
            })
            .collect()
    }

    /// Window the entity is stale in, or `None` while within its SLA
    fn window_for(
        &self,
        entity_type: EntityType,
        last: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<SlaWindow> {
        let Some(last) = last else {
            return Some(SlaWindow {
                anchor: None,
                index: 0,
            });
        };

        let threshold = self.thresholds.threshold_for(entity_type).num_seconds();
        let elapsed = (now - last).num_seconds();
        if threshold <= 0 || elapsed <= threshold {
            return None;
        }

        Some(SlaWindow {
            anchor: Some(last),
            index: elapsed / threshold,
        })
    }

    /// Raise signals for stale entities whose window is not yet open
    ///
    /// New signals are recorded in `ledger`; running the scan again with
    /// the same input raises nothing.
    pub fn scan(
        &self,
        entities: &[TrackedEntity],
        interactions: &[Interaction],
        ledger: &mut SignalLedger,
        now: DateTime<Utc>,
    ) -> Vec<FollowUpSignal> {
        self.evaluate(entities, interactions, now)
            .into_iter()
            .map(|staleness| staleness.into_signal(now))
            .filter(|signal| ledger.record(signal.clone()))
            .collect()
    }
}
