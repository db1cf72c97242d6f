//! In-memory repository implementation
//!
//! Thread-safe implementation using a single RwLock over both tables, so a
//! write set touching an idea and an engagement lands atomically.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use shared::{
    ConflictError, Engagement, EngagementId, EngagementStatus, EngineError, Idea, IdeaId,
    IdeaStatus, RecordKind, Result,
};

use super::{Committed, PipelineRepository, Write, WriteSet};

/// Access to the identity and version stamp of a stored record
trait Versioned: Clone {
    type Id: Clone + Eq + Hash + ToString;
    const KIND: RecordKind;

    fn key(&self) -> &Self::Id;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

impl Versioned for Idea {
    type Id = IdeaId;
    const KIND: RecordKind = RecordKind::Idea;

    fn key(&self) -> &IdeaId {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Versioned for Engagement {
    type Id = EngagementId;
    const KIND: RecordKind = RecordKind::Engagement;

    fn key(&self) -> &EngagementId {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

fn validate<T: Versioned>(table: &HashMap<T::Id, T>, writes: &[Write<T>]) -> Result<()> {
    let mut seen = HashSet::new();
    for write in writes {
        let id = write.record().key();
        if !seen.insert(id.clone()) {
            return Err(EngineError::InvalidInput(format!(
                "{} '{}' written twice in one commit",
                T::KIND,
                id.to_string()
            )));
        }

        match write {
            Write::Create(_) => {
                if let Some(existing) = table.get(id) {
                    return Err(ConflictError {
                        kind: T::KIND,
                        id: id.to_string(),
                        expected: 0,
                        actual: existing.version(),
                    }
                    .into());
                }
            }
            Write::Update {
                expected_version, ..
            } => {
                let stored = table
                    .get(id)
                    .ok_or_else(|| EngineError::not_found(T::KIND, id.to_string()))?;
                if stored.version() != *expected_version {
                    return Err(ConflictError {
                        kind: T::KIND,
                        id: id.to_string(),
                        expected: *expected_version,
                        actual: stored.version(),
                    }
                    .into());
                }
            }
        }
    }
    Ok(())
}

fn apply<T: Versioned>(table: &mut HashMap<T::Id, T>, writes: Vec<Write<T>>) -> Vec<T> {
    writes
        .into_iter()
        .map(|write| {
            let record = match write {
                Write::Create(record) => record,
                Write::Update {
                    mut record,
                    expected_version,
                } => {
                    record.set_version(expected_version + 1);
                    record
                }
            };
            table.insert(record.key().clone(), record.clone());
            record
        })
        .collect()
}

#[derive(Debug, Default)]
struct Tables {
    ideas: HashMap<IdeaId, Idea>,
    engagements: HashMap<EngagementId, Engagement>,
}

/// In-memory Pipeline Repository
#[derive(Debug, Clone, Default)]
pub struct InMemoryPipelineRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryPipelineRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository with records read from the caller's store
    pub fn from_records(
        ideas: impl IntoIterator<Item = Idea>,
        engagements: impl IntoIterator<Item = Engagement>,
    ) -> Self {
        let tables = Tables {
            ideas: ideas.into_iter().map(|i| (i.id.clone(), i)).collect(),
            engagements: engagements.into_iter().map(|e| (e.id.clone(), e)).collect(),
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| EngineError::Storage("Failed to acquire read lock".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| EngineError::Storage("Failed to acquire write lock".to_string()))
    }
}

impl PipelineRepository for InMemoryPipelineRepository {
    fn find_idea(&self, id: &IdeaId) -> Result<Option<Idea>> {
        Ok(self.read()?.ideas.get(id).cloned())
    }

    fn find_engagement(&self, id: &EngagementId) -> Result<Option<Engagement>> {
        Ok(self.read()?.engagements.get(id).cloned())
    }

    fn ideas_by_status(&self, status: IdeaStatus) -> Result<Vec<Idea>> {
        let mut ideas: Vec<Idea> = self
            .read()?
            .ideas
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect();
        ideas.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(ideas)
    }

    fn engagements_by_status(&self, status: EngagementStatus) -> Result<Vec<Engagement>> {
        let mut engagements: Vec<Engagement> = self
            .read()?
            .engagements
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect();
        engagements.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(engagements)
    }

    fn commit(&self, writes: WriteSet) -> Result<Committed> {
        let mut tables = self.write()?;

        validate(&tables.ideas, &writes.ideas)?;
        validate(&tables.engagements, &writes.engagements)?;

        let WriteSet { ideas, engagements } = writes;
        Ok(Committed {
            ideas: apply(&mut tables.ideas, ideas),
            engagements: apply(&mut tables.engagements, engagements),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::CompetencyKey;

    fn idea(id: &str) -> Idea {
        Idea::new(IdeaId::new(id), "Title", "Description", Utc::now())
    }

    fn engagement(id: &str) -> Engagement {
        Engagement::new(EngagementId::new(id), "acme", Vec::<CompetencyKey>::new(), Utc::now())
    }

    #[test]
    fn test_insert_and_find() {
        let repo = InMemoryPipelineRepository::new();
        repo.insert_idea(idea("I1")).unwrap();

        let found = repo.find_idea(&IdeaId::new("I1")).unwrap();
        assert!(found.is_some());
        assert!(repo.find_idea(&IdeaId::new("I2")).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_create_conflicts() {
        let repo = InMemoryPipelineRepository::new();
        repo.insert_engagement(engagement("E1")).unwrap();

        let err = repo.insert_engagement(engagement("E1")).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_update_bumps_version() {
        let repo = InMemoryPipelineRepository::new();
        let mut e1 = repo.insert_engagement(engagement("E1")).unwrap();
        e1.status = EngagementStatus::Active;

        let committed = repo
            .commit(WriteSet::new().engagement(Write::Update {
                record: e1,
                expected_version: 1,
            }))
            .unwrap();

        assert_eq!(committed.engagements[0].version, 2);
        let stored = repo.find_engagement(&EngagementId::new("E1")).unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.status, EngagementStatus::Active);
    }

    #[test]
    fn test_failed_commit_applies_nothing() {
        let repo = InMemoryPipelineRepository::new();
        let mut i1 = repo.insert_idea(idea("I1")).unwrap();
        i1.status = IdeaStatus::UnderReview;

        // Idea write is valid, engagement write is stale
        let stale = engagement("E9");
        let err = repo
            .commit(
                WriteSet::new()
                    .idea(Write::Update {
                        record: i1,
                        expected_version: 1,
                    })
                    .engagement(Write::Update {
                        record: stale,
                        expected_version: 1,
                    }),
            )
            .unwrap_err();

        assert!(err.is_not_found());
        let stored = repo.find_idea(&IdeaId::new("I1")).unwrap().unwrap();
        assert_eq!(stored.status, IdeaStatus::Submitted);
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn test_by_status_is_sorted() {
        let repo = InMemoryPipelineRepository::from_records(
            [idea("I2"), idea("I1")],
            [engagement("E1")],
        );

        let ids: Vec<String> = repo
            .ideas_by_status(IdeaStatus::Submitted)
            .unwrap()
            .into_iter()
            .map(|i| i.id.to_string())
            .collect();
        assert_eq!(ids, vec!["I1", "I2"]);
        assert_eq!(repo.engagements_by_status(EngagementStatus::Draft).unwrap().len(), 1);
    }
}
