use std::path::Path;

use async_trait::async_trait;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionResult,
};
use sled::Transactional;
use tracing::debug;

use super::FeatureStore;
use crate::error::{StoreError, StoreResult, UniqueField};
use crate::feature::{Feature, FeatureId, NewFeature};
use crate::retry::RetryPolicy;

const FEATURES_TREE: &str = "features";
const FRIENDLY_ID_TREE: &str = "features_by_friendly_id";
const NAME_TREE: &str = "features_by_name";

/// Persistent feature storage backed by sled.
///
/// Records live in the `features` tree keyed by id bytes. Two index trees map
/// friendly id (big-endian) and name to the owning id. Every write touches all
/// three trees inside one transaction, so the indexes and the uniqueness checks
/// made against them cannot drift from the records.
pub struct SledStore {
    db: sled::Db,
    features: sled::Tree,
    by_friendly_id: sled::Tree,
    by_name: sled::Tree,
    retry: RetryPolicy,
}

impl SledStore {
    pub fn new(db: sled::Db, retry: RetryPolicy) -> StoreResult<Self> {
        let features = db.open_tree(FEATURES_TREE)?;
        let by_friendly_id = db.open_tree(FRIENDLY_ID_TREE)?;
        let by_name = db.open_tree(NAME_TREE)?;
        Ok(Self {
            db,
            features,
            by_friendly_id,
            by_name,
            retry,
        })
    }

    /// Open a sled database at the given directory path.
    pub fn open(data_dir: impl AsRef<Path>, retry: RetryPolicy) -> StoreResult<Self> {
        let db = sled::open(data_dir)?;
        Self::new(db, retry)
    }

    /// A database that is deleted when dropped.
    pub fn temporary(retry: RetryPolicy) -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::new(db, retry)
    }

    fn decode(bytes: &[u8]) -> StoreResult<Feature> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn read_by_id(&self, id: FeatureId) -> StoreResult<Option<Feature>> {
        match self.features.get(id.as_bytes())? {
            Some(bytes) => Self::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn read_via_index(&self, index: &sled::Tree, key: &[u8]) -> StoreResult<Option<Feature>> {
        let Some(id_bytes) = index.get(key)? else {
            return Ok(None);
        };
        let id = FeatureId::from_slice(&id_bytes)
            .ok_or_else(|| StoreError::Corrupt("index entry is not an id".to_string()))?;
        self.read_by_id(id)
    }

    fn read_all(&self) -> StoreResult<Vec<Feature>> {
        let mut features = Vec::with_capacity(self.features.len());
        for item in self.by_friendly_id.iter() {
            let (_, id_bytes) = item?;
            let id = FeatureId::from_slice(&id_bytes)
                .ok_or_else(|| StoreError::Corrupt("index entry is not an id".to_string()))?;
            // A concurrent delete may have removed the record after the index scan saw it.
            if let Some(feature) = self.read_by_id(id)? {
                features.push(feature);
            }
        }
        Ok(features)
    }

    fn insert_once(&self, feature: &Feature, record: &[u8]) -> StoreResult<()> {
        let id_key = &feature.id.as_bytes()[..];
        let friendly_key = feature.friendly_id.to_be_bytes();
        let name_key = feature.name.as_bytes();

        let result: TransactionResult<(), StoreError> =
            (&self.features, &self.by_friendly_id, &self.by_name).transaction(
                |(features, by_friendly_id, by_name)| -> ConflictableTransactionResult<(), StoreError> {
                    if by_friendly_id.get(&friendly_key[..])?.is_some() {
                        return abort(StoreError::duplicate(
                            UniqueField::FriendlyId,
                            feature.friendly_id,
                        ));
                    }
                    if by_name.get(name_key)?.is_some() {
                        return abort(StoreError::duplicate(UniqueField::Name, &feature.name));
                    }
                    features.insert(id_key, record)?;
                    by_friendly_id.insert(&friendly_key[..], id_key)?;
                    by_name.insert(name_key, id_key)?;
                    Ok(())
                },
            );
        from_transaction(result)
    }

    fn update_once(&self, feature: &Feature, record: &[u8]) -> StoreResult<()> {
        let id_key = &feature.id.as_bytes()[..];
        let friendly_key = feature.friendly_id.to_be_bytes();
        let name_key = feature.name.as_bytes();

        let result: TransactionResult<(), StoreError> =
            (&self.features, &self.by_friendly_id, &self.by_name).transaction(
                |(features, by_friendly_id, by_name)| -> ConflictableTransactionResult<(), StoreError> {
                    let Some(stored) = features.get(id_key)? else {
                        return abort(StoreError::NotFound(feature.id));
                    };
                    let original = match Self::decode(&stored) {
                        Ok(original) => original,
                        Err(e) => return abort(e),
                    };

                    if original.friendly_id != feature.friendly_id {
                        if by_friendly_id.get(&friendly_key[..])?.is_some() {
                            return abort(StoreError::duplicate(
                                UniqueField::FriendlyId,
                                feature.friendly_id,
                            ));
                        }
                        by_friendly_id.remove(&original.friendly_id.to_be_bytes()[..])?;
                        by_friendly_id.insert(&friendly_key[..], id_key)?;
                    }

                    if original.name != feature.name {
                        if by_name.get(name_key)?.is_some() {
                            return abort(StoreError::duplicate(UniqueField::Name, &feature.name));
                        }
                        by_name.remove(original.name.as_bytes())?;
                        by_name.insert(name_key, id_key)?;
                    }

                    features.insert(id_key, record)?;
                    Ok(())
                },
            );
        from_transaction(result)
    }

    fn delete_once(&self, id: FeatureId) -> StoreResult<bool> {
        let id_key = &id.as_bytes()[..];

        let result: TransactionResult<bool, StoreError> =
            (&self.features, &self.by_friendly_id, &self.by_name).transaction(
                |(features, by_friendly_id, by_name)| -> ConflictableTransactionResult<bool, StoreError> {
                    let Some(stored) = features.remove(id_key)? else {
                        return Ok(false);
                    };
                    let original = match Self::decode(&stored) {
                        Ok(original) => original,
                        Err(e) => return abort(e),
                    };
                    by_friendly_id.remove(&original.friendly_id.to_be_bytes()[..])?;
                    by_name.remove(original.name.as_bytes())?;
                    Ok(true)
                },
            );
        from_transaction(result)
    }

    fn flush(&self) -> StoreResult<()> {
        self.retry.run("flush", || {
            self.db.flush()?;
            Ok(())
        })
    }
}

fn abort<T>(e: StoreError) -> ConflictableTransactionResult<T, StoreError> {
    Err(ConflictableTransactionError::Abort(e))
}

fn from_transaction<T>(result: TransactionResult<T, StoreError>) -> StoreResult<T> {
    result.map_err(|e| match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => e.into(),
    })
}

#[async_trait]
impl FeatureStore for SledStore {
    async fn get_by_id(&self, id: FeatureId) -> StoreResult<Option<Feature>> {
        debug!(%id, "get_by_id");
        self.retry.run("get_by_id", || self.read_by_id(id))
    }

    async fn get_by_friendly_id(&self, friendly_id: u32) -> StoreResult<Option<Feature>> {
        debug!(friendly_id, "get_by_friendly_id");
        let key = friendly_id.to_be_bytes();
        self.retry.run("get_by_friendly_id", || {
            self.read_via_index(&self.by_friendly_id, &key)
        })
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Feature>> {
        debug!(name, "get_by_name");
        self.retry.run("get_by_name", || {
            self.read_via_index(&self.by_name, name.as_bytes())
        })
    }

    async fn exists_by_id(&self, id: FeatureId) -> StoreResult<bool> {
        self.retry.run("exists_by_id", || {
            Ok(self.features.contains_key(id.as_bytes())?)
        })
    }

    async fn exists_by_friendly_id(&self, friendly_id: u32) -> StoreResult<bool> {
        let key = friendly_id.to_be_bytes();
        self.retry.run("exists_by_friendly_id", || {
            Ok(self.by_friendly_id.contains_key(key)?)
        })
    }

    async fn list_all(&self) -> StoreResult<Vec<Feature>> {
        self.retry.run("list_all", || self.read_all())
    }

    async fn insert(&self, feature: NewFeature) -> StoreResult<FeatureId> {
        let feature = Feature::from_new(FeatureId::generate(), feature);
        let record = serde_json::to_vec(&feature)?;
        debug!(id = %feature.id, friendly_id = feature.friendly_id, name = %feature.name, "insert");

        self.retry
            .run("insert", || self.insert_once(&feature, &record))?;
        self.flush()?;
        Ok(feature.id)
    }

    async fn update(&self, mut feature: Feature) -> StoreResult<()> {
        if feature.id.is_nil() {
            return Err(StoreError::MissingId);
        }
        feature.normalize();
        let record = serde_json::to_vec(&feature)?;
        debug!(id = %feature.id, friendly_id = feature.friendly_id, name = %feature.name, "update");

        self.retry
            .run("update", || self.update_once(&feature, &record))?;
        self.flush()
    }

    async fn delete(&self, id: FeatureId) -> StoreResult<bool> {
        debug!(%id, "delete");
        let removed = self.retry.run("delete", || self.delete_once(id))?;
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.features.len())
    }
}
