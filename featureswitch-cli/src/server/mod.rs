pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use self::metrics::{handle_metrics, track_metrics};
use self::routes::{
    add_feature, add_to_bucket, delete_feature, get_bucket, get_feature,
    get_feature_by_name, handle_health, list_features, query_bucket, remove_from_bucket,
    update_feature,
};
pub use self::state::AppState;

/// Build the HTTP router over the given state.
///
/// `DELETE /features/{id}/bucket/clear` empties the bucket list. A bucket
/// literally named `clear` can still be added and queried.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .route(
            "/features",
            get(list_features).post(add_feature).put(update_feature),
        )
        .route("/features/name/{name}", get(get_feature_by_name))
        .route("/features/{id}", get(get_feature).delete(delete_feature))
        .route("/features/{id}/bucket", get(get_bucket))
        .route(
            "/features/{id}/bucket/{bucket_id}",
            get(query_bucket)
                .put(add_to_bucket)
                .delete(remove_from_bucket),
        )
        .layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}
