//! SignalLedger - Open follow-up signals
//!
//! A signal is keyed by entity and SLA window. The ledger is caller-owned
//! state: persist `open_signals()` after a scan and rebuild with
//! `from_open` before the next one.

use chrono::{DateTime, Utc};
use shared::{EntityId, EntityType, Interaction};
use std::collections::BTreeMap;

use crate::detector::{FollowUpSignal, SlaWindow};

type SignalKey = (EntityId, EntityType, SlaWindow);

fn key_of(signal: &FollowUpSignal) -> SignalKey {
    (signal.entity_id.clone(), signal.entity_type, signal.window)
}

#[derive(Debug, Clone, Default)]
pub struct SignalLedger {
    open: BTreeMap<SignalKey, FollowUpSignal>,
}

impl SignalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted open signals
    pub fn from_open(signals: impl IntoIterator<Item = FollowUpSignal>) -> Self {
        let mut ledger = Self::new();
        for signal in signals {
            ledger.record(signal);
        }
        ledger
    }

    /// Record a signal; false if its window already has one
    pub fn record(&mut self, signal: FollowUpSignal) -> bool {
        let key = key_of(&signal);
        if self.open.contains_key(&key) {
            return false;
        }
        self.open.insert(key, signal);
        true
    }

    pub fn is_open(&self, signal: &FollowUpSignal) -> bool {
        self.open.contains_key(&key_of(signal))
    }

    /// Open signals ordered by entity, then window
    pub fn open_signals(&self) -> Vec<FollowUpSignal> {
        self.open.values().cloned().collect()
    }

    pub fn open_for(&self, entity_id: &EntityId) -> Vec<&FollowUpSignal> {
        self.open
            .values()
            .filter(|s| &s.entity_id == entity_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Close every signal whose entity has been contacted since the signal
    /// was raised; returns the closed signals
    pub fn resolve_contacted(&mut self, interactions: &[Interaction]) -> Vec<FollowUpSignal> {
        let mut latest: BTreeMap<(&EntityId, EntityType), DateTime<Utc>> = BTreeMap::new();
        for interaction in interactions {
            latest
                .entry((&interaction.entity_id, interaction.entity_type))
                .and_modify(|t| *t = (*t).max(interaction.occurred_at))
                .or_insert(interaction.occurred_at);
        }

        let contacted: Vec<SignalKey> = self
            .open
            .iter()
            .filter(|(_, signal)| {
                latest
                    .get(&(&signal.entity_id, signal.entity_type))
                    .is_some_and(|at| *at >= signal.raised_at)
            })
            .map(|(key, _)| key.clone())
            .collect();

        contacted
            .into_iter()
            .filter_map(|key| self.open.remove(&key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use shared::InteractionKind;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn signal(id: &str, index: i64, raised_at: DateTime<Utc>) -> FollowUpSignal {
        FollowUpSignal {
            entity_id: EntityId::new(id),
            entity_type: EntityType::Opportunity,
            raised_at,
            window: SlaWindow {
                anchor: Some(day(0)),
                index,
            },
        }
    }

    #[test]
    fn test_record_once_per_window() {
        let mut ledger = SignalLedger::new();

        assert!(ledger.record(signal("o1", 1, day(15))));
        // Same window, later scan time
        assert!(!ledger.record(signal("o1", 1, day(20))));
        assert!(ledger.record(signal("o1", 2, day(29))));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.open_for(&EntityId::new("o1")).len(), 2);
    }

    #[test]
    fn test_from_open_round_trips() {
        let signals = vec![signal("o2", 1, day(15)), signal("o1", 1, day(15))];
        let ledger = SignalLedger::from_open(signals.clone());

        assert!(signals.iter().all(|s| ledger.is_open(s)));
        let ids: Vec<String> = ledger
            .open_signals()
            .iter()
            .map(|s| s.entity_id.to_string())
            .collect();
        assert_eq!(ids, vec!["o1", "o2"]);
    }

    #[test]
    fn test_resolve_contacted() {
        let mut ledger = SignalLedger::from_open([signal("o1", 1, day(15)), signal("o2", 1, day(15))]);

        let interactions = vec![
            // Before the signal: does not resolve it
            Interaction::new(EntityId::new("o2"), EntityType::Opportunity, InteractionKind::Call, day(10)),
            Interaction::new(EntityId::new("o1"), EntityType::Opportunity, InteractionKind::Call, day(16)),
            // Same id, other entity type
            Interaction::new(EntityId::new("o2"), EntityType::Contact, InteractionKind::Call, day(16)),
        ];

        let closed = ledger.resolve_contacted(&interactions);

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].entity_id, EntityId::new("o1"));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.open_for(&EntityId::new("o1")).is_empty());
    }
}
