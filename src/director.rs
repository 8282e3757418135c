use std::sync::Arc;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::feature::{Feature, FeatureId, NewFeature};
use crate::store::FeatureStore;

/// Entry point the HTTP layer talks to. Delegates to the injected store and
/// implements bucket edits on top of it.
///
/// Bucket edits read the whole feature, change its bucket list and write it
/// back with [`FeatureStore::update`]. Two concurrent edits to the same
/// feature can therefore lose one of the changes.
#[derive(Clone)]
pub struct FeaturesDirector {
    store: Arc<dyn FeatureStore>,
}

impl FeaturesDirector {
    pub fn new(store: Arc<dyn FeatureStore>) -> Self {
        Self { store }
    }

    pub async fn all_features(&self) -> StoreResult<Vec<Feature>> {
        self.store.list_all().await
    }

    pub async fn feature_by_id(&self, id: FeatureId) -> StoreResult<Option<Feature>> {
        self.store.get_by_id(id).await
    }

    pub async fn feature_exists(&self, id: FeatureId) -> StoreResult<bool> {
        self.store.exists_by_id(id).await
    }

    pub async fn friendly_id_exists(&self, friendly_id: u32) -> StoreResult<bool> {
        self.store.exists_by_friendly_id(friendly_id).await
    }

    pub async fn feature_by_name(&self, name: &str) -> StoreResult<Option<Feature>> {
        self.store.get_by_name(name).await
    }

    pub async fn feature_by_friendly_id(&self, friendly_id: u32) -> StoreResult<Option<Feature>> {
        self.store.get_by_friendly_id(friendly_id).await
    }

    pub async fn add_feature(&self, feature: NewFeature) -> StoreResult<FeatureId> {
        self.store.insert(feature).await
    }

    pub async fn update_feature(&self, feature: Feature) -> StoreResult<()> {
        self.store.update(feature).await
    }

    pub async fn delete_feature(&self, id: FeatureId) -> StoreResult<bool> {
        self.store.delete(id).await
    }

    pub async fn feature_count(&self) -> StoreResult<usize> {
        self.store.count().await
    }

    async fn require(&self, id: FeatureId) -> StoreResult<Feature> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    pub async fn bucket_list(&self, id: FeatureId) -> StoreResult<Vec<String>> {
        Ok(self.require(id).await?.bucket_list)
    }

    pub async fn bucket_contains(&self, id: FeatureId, bucket_id: &str) -> StoreResult<bool> {
        Ok(self.require(id).await?.in_bucket(bucket_id))
    }

    /// Adds `bucket_id` to the feature's bucket list. Already present is a no-op.
    pub async fn add_to_bucket(&self, id: FeatureId, bucket_id: &str) -> StoreResult<()> {
        let mut feature = self.require(id).await?;
        if feature.add_bucket(bucket_id) {
            debug!(%id, bucket_id, "bucket add");
            self.store.update(feature).await?;
        }
        Ok(())
    }

    /// Removes `bucket_id` from the feature's bucket list. Absent is a no-op.
    pub async fn remove_from_bucket(&self, id: FeatureId, bucket_id: &str) -> StoreResult<()> {
        let mut feature = self.require(id).await?;
        if feature.remove_bucket(bucket_id) {
            debug!(%id, bucket_id, "bucket remove");
            self.store.update(feature).await?;
        }
        Ok(())
    }

    pub async fn clear_bucket(&self, id: FeatureId) -> StoreResult<()> {
        let mut feature = self.require(id).await?;
        if !feature.bucket_list.is_empty() {
            debug!(%id, "bucket clear");
            feature.clear_buckets();
            self.store.update(feature).await?;
        }
        Ok(())
    }
}
