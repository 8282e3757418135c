pub mod memory;
pub mod sled_store;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::feature::{Feature, FeatureId, NewFeature};

pub use memory::MemoryStore;
pub use sled_store::SledStore;

/// Storage trait for features. Implementations must be thread-safe and keep
/// `friendly_id` and `name` unique across all stored features.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    async fn get_by_id(&self, id: FeatureId) -> StoreResult<Option<Feature>>;

    async fn get_by_friendly_id(&self, friendly_id: u32) -> StoreResult<Option<Feature>>;

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Feature>>;

    async fn exists_by_id(&self, id: FeatureId) -> StoreResult<bool>;

    async fn exists_by_friendly_id(&self, friendly_id: u32) -> StoreResult<bool>;

    /// All features, ordered by ascending friendly id.
    async fn list_all(&self) -> StoreResult<Vec<Feature>>;

    /// Persist a new feature and return its generated id.
    ///
    /// Fails with `DuplicateKey` if the friendly id or name is taken.
    async fn insert(&self, feature: NewFeature) -> StoreResult<FeatureId>;

    /// Full replace of an existing feature, keyed by `feature.id`.
    ///
    /// Uniqueness is re-checked only for a friendly id or name that differs
    /// from the stored record.
    async fn update(&self, feature: Feature) -> StoreResult<()>;

    /// Remove a feature. Returns `false` if nothing was stored under `id`.
    async fn delete(&self, id: FeatureId) -> StoreResult<bool>;

    /// Number of stored features.
    async fn count(&self) -> StoreResult<usize>;
}
