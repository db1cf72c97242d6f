//! CompetencyRegistry - Resource profiles indexed by id

use shared::{
    CompetencyKey, CompetencySet, EngineError, Proficiency, RecordKind, Resource, ResourceId,
    Result,
};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Competency registry
///
/// Thread-safe; profiles are held behind `Arc` so a replacement swaps the
/// whole record at once and readers holding a snapshot keep the old one.
#[derive(Debug, Clone, Default)]
pub struct CompetencyRegistry {
    resources: Arc<RwLock<BTreeMap<ResourceId, Arc<Resource>>>>,
}

impl CompetencyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from an initial pool
    pub fn from_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let map = resources
            .into_iter()
            .map(|r| (r.id.clone(), Arc::new(r)))
            .collect();
        Self {
            resources: Arc::new(RwLock::new(map)),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<ResourceId, Arc<Resource>>>> {
        self.resources
            .read()
            .map_err(|_| EngineError::Storage("Failed to acquire registry read lock".to_string()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<ResourceId, Arc<Resource>>>> {
        self.resources
            .write()
            .map_err(|_| EngineError::Storage("Failed to acquire registry write lock".to_string()))
    }

    // ========== Queries ==========

    /// Competency set of one resource
    pub fn query(&self, id: &ResourceId) -> Result<CompetencySet> {
        self.get(id).map(|r| r.competencies.clone())
    }

    /// Full resource record
    pub fn get(&self, id: &ResourceId) -> Result<Arc<Resource>> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(RecordKind::Resource, id.as_str()))
    }

    /// All resources, ascending by id
    pub fn all(&self) -> Result<Vec<Resource>> {
        Ok(self.read()?.values().map(|r| Resource::clone(r)).collect())
    }

    /// Immutable snapshot of the pool for matching
    pub fn snapshot(&self) -> Result<Vec<Arc<Resource>>> {
        Ok(self.read()?.values().cloned().collect())
    }

    /// Resources holding a competency at any level
    pub fn find_by_competency(&self, key: &CompetencyKey) -> Result<Vec<Arc<Resource>>> {
        Ok(self
            .read()?
            .values()
            .filter(|r| r.competencies.contains(key))
            .cloned()
            .collect())
    }

    /// Resources holding a competency at `min_level` or above
    pub fn find_at_least(
        &self,
        key: &CompetencyKey,
        min_level: Proficiency,
    ) -> Result<Vec<Arc<Resource>>> {
        Ok(self
            .read()?
            .values()
            .filter(|r| r.competencies.level(key).is_some_and(|l| l >= min_level))
            .cloned()
            .collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    // ========== Administrator updates ==========

    /// Replace (or add) a resource profile as a whole
    ///
    /// Returns the previous profile, if there was one.
    pub fn replace(&self, resource: Resource) -> Result<Option<Arc<Resource>>> {
        let mut resources = self.write()?;
        Ok(resources.insert(resource.id.clone(), Arc::new(resource)))
    }

    /// Replace the entire pool
    pub fn load(&self, pool: impl IntoIterator<Item = Resource>) -> Result<()> {
        let fresh: BTreeMap<_, _> = pool
            .into_iter()
            .map(|r| (r.id.clone(), Arc::new(r)))
            .collect();
        *self.write()? = fresh;
        Ok(())
    }

    /// Retire a resource
    pub fn remove(&self, id: &ResourceId) -> Result<Arc<Resource>> {
        self.write()?
            .remove(id)
            .ok_or_else(|| EngineError::not_found(RecordKind::Resource, id.as_str()))
    }
}
