use std::sync::Arc;

use featureswitch_lib::{FeatureStore, FeaturesDirector};

/// Shared application state for the HTTP server.
///
/// Holds the one store handle for the lifetime of the process; handlers reach
/// it through the director.
pub struct AppState {
    pub director: FeaturesDirector,
}

impl AppState {
    pub fn new(store: Arc<dyn FeatureStore>) -> Self {
        Self {
            director: FeaturesDirector::new(store),
        }
    }
}
