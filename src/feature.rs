use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest friendly id a feature may carry.
pub const MAX_FRIENDLY_ID: u32 = i32::MAX as u32;

/// Opaque store-generated identifier of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(Uuid);

impl FeatureId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        Uuid::from_slice(bytes).ok().map(Self)
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FeatureId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for FeatureId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// A stored feature switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: FeatureId,
    pub friendly_id: u32,
    pub name: String,
    #[serde(default)]
    pub bucket_list: Vec<String>,
}

impl Feature {
    pub fn from_new(id: FeatureId, new: NewFeature) -> Self {
        Self {
            id,
            friendly_id: new.friendly_id,
            name: new.name,
            bucket_list: dedup_buckets(new.bucket_list),
        }
    }

    /// Linear containment check against the bucket list.
    pub fn in_bucket(&self, bucket_id: &str) -> bool {
        self.bucket_list.iter().any(|b| b == bucket_id)
    }

    /// Appends `bucket_id` unless already present. Returns whether the list changed.
    pub fn add_bucket(&mut self, bucket_id: &str) -> bool {
        if self.in_bucket(bucket_id) {
            return false;
        }
        self.bucket_list.push(bucket_id.to_string());
        true
    }

    /// Removes `bucket_id` if present. Returns whether the list changed.
    pub fn remove_bucket(&mut self, bucket_id: &str) -> bool {
        let before = self.bucket_list.len();
        self.bucket_list.retain(|b| b != bucket_id);
        before != self.bucket_list.len()
    }

    pub fn clear_buckets(&mut self) {
        self.bucket_list.clear();
    }

    /// Collapses duplicate bucket ids, keeping first occurrences in order.
    pub fn normalize(&mut self) {
        let buckets = std::mem::take(&mut self.bucket_list);
        self.bucket_list = dedup_buckets(buckets);
    }
}

/// A feature that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeature {
    pub friendly_id: u32,
    pub name: String,
    pub bucket_list: Vec<String>,
}

impl NewFeature {
    pub fn new(friendly_id: u32, name: impl Into<String>) -> Self {
        Self {
            friendly_id,
            name: name.into(),
            bucket_list: Vec::new(),
        }
    }

    pub fn with_buckets<I, S>(mut self, buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bucket_list = buckets.into_iter().map(Into::into).collect();
        self
    }
}

fn dedup_buckets(buckets: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        if !out.contains(&bucket) {
            out.push(bucket);
        }
    }
    out
}
