use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::FeatureStore;
use crate::error::{StoreError, StoreResult, UniqueField};
use crate::feature::{Feature, FeatureId, NewFeature};

/// In-memory feature storage backed by a `RwLock<HashMap>`.
///
/// Uniqueness is checked with a linear scan under the write lock.
pub struct MemoryStore {
    data: RwLock<HashMap<FeatureId, Feature>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_unique(data: &HashMap<FeatureId, Feature>, friendly_id: u32, name: &str) -> StoreResult<()> {
    if data.values().any(|f| f.friendly_id == friendly_id) {
        return Err(StoreError::duplicate(UniqueField::FriendlyId, friendly_id));
    }
    if data.values().any(|f| f.name == name) {
        return Err(StoreError::duplicate(UniqueField::Name, name));
    }
    Ok(())
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn get_by_id(&self, id: FeatureId) -> StoreResult<Option<Feature>> {
        let data = self.data.read().await;
        Ok(data.get(&id).cloned())
    }

    async fn get_by_friendly_id(&self, friendly_id: u32) -> StoreResult<Option<Feature>> {
        let data = self.data.read().await;
        Ok(data.values().find(|f| f.friendly_id == friendly_id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Feature>> {
        let data = self.data.read().await;
        Ok(data.values().find(|f| f.name == name).cloned())
    }

    async fn exists_by_id(&self, id: FeatureId) -> StoreResult<bool> {
        let data = self.data.read().await;
        Ok(data.contains_key(&id))
    }

    async fn exists_by_friendly_id(&self, friendly_id: u32) -> StoreResult<bool> {
        let data = self.data.read().await;
        Ok(data.values().any(|f| f.friendly_id == friendly_id))
    }

    async fn list_all(&self) -> StoreResult<Vec<Feature>> {
        let data = self.data.read().await;
        let mut features: Vec<Feature> = data.values().cloned().collect();
        features.sort_by_key(|f| f.friendly_id);
        Ok(features)
    }

    async fn insert(&self, feature: NewFeature) -> StoreResult<FeatureId> {
        let mut data = self.data.write().await;
        check_unique(&data, feature.friendly_id, &feature.name)?;
        let id = FeatureId::generate();
        data.insert(id, Feature::from_new(id, feature));
        Ok(id)
    }

    async fn update(&self, mut feature: Feature) -> StoreResult<()> {
        if feature.id.is_nil() {
            return Err(StoreError::MissingId);
        }
        let mut data = self.data.write().await;
        let original = data
            .get(&feature.id)
            .ok_or(StoreError::NotFound(feature.id))?;

        // Only keys that changed need re-checking; the record never collides with itself.
        let friendly_id_changed = original.friendly_id != feature.friendly_id;
        let name_changed = original.name != feature.name;
        if friendly_id_changed
            && data
                .values()
                .any(|f| f.id != feature.id && f.friendly_id == feature.friendly_id)
        {
            return Err(StoreError::duplicate(
                UniqueField::FriendlyId,
                feature.friendly_id,
            ));
        }
        if name_changed && data.values().any(|f| f.id != feature.id && f.name == feature.name) {
            return Err(StoreError::duplicate(UniqueField::Name, &feature.name));
        }

        feature.normalize();
        data.insert(feature.id, feature);
        Ok(())
    }

    async fn delete(&self, id: FeatureId) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        Ok(data.remove(&id).is_some())
    }

    async fn count(&self) -> StoreResult<usize> {
        let data = self.data.read().await;
        Ok(data.len())
    }
}
