//! Storage and domain logic for feature switches: uniquely keyed toggles
//! carrying a list of bucket ids for targeted rollout.
//!
//! ```no_run
//! use std::sync::Arc;
//! use featureswitch_lib::{FeaturesDirector, NewFeature, RetryPolicy, SledStore};
//!
//! # async fn demo() -> Result<(), featureswitch_lib::StoreError> {
//! let store = SledStore::open("./data", RetryPolicy::default())?;
//! let director = FeaturesDirector::new(Arc::new(store));
//! let id = director.add_feature(NewFeature::new(1, "NewCheckout")).await?;
//! director.add_to_bucket(id, "beta-testers").await?;
//! assert!(director.bucket_contains(id, "beta-testers").await?);
//! # Ok(())
//! # }
//! ```

pub mod director;
pub mod error;
pub mod feature;
pub mod retry;
pub mod store;
pub mod validate;

pub use director::FeaturesDirector;
pub use error::{StoreError, StoreResult, UniqueField};
pub use feature::{Feature, FeatureId, NewFeature, MAX_FRIENDLY_ID};
pub use retry::RetryPolicy;
pub use store::{FeatureStore, MemoryStore, SledStore};
pub use validate::ValidationErrors;
