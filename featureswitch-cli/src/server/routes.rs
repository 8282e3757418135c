use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use featureswitch_lib::validate::{self, check_friendly_id, ValidationErrors};
use featureswitch_lib::{Feature, FeatureId};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ApiError;
use super::metrics::metrics;
use super::state::AppState;

pub const PROCESSED_MESSAGE: &str = "Request processed successfully.";

/// Bucket segment that turns `DELETE /features/{id}/bucket/{bucket_id}` into
/// a clear of the whole list.
pub const CLEAR_SEGMENT: &str = "clear";

/// Friendly ids fit in ten digits; longer digit strings are tried as UUIDs.
const MAX_FRIENDLY_ID_DIGITS: usize = 10;

type ApiResult<T = Response> = Result<T, ApiError>;

// ── Wire types ───────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemResponse {
    pub item: Feature,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub items: Vec<Feature>,
}

/// Body of `POST /features`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeatureRequest {
    pub name: Option<String>,
    pub friendly_id: Option<i64>,
    pub bucket_list: Option<Vec<String>>,
}

/// Body of `PUT /features`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeatureRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub friendly_id: Option<i64>,
    pub bucket_list: Option<Vec<String>>,
}

// ── Helpers ──────────────────────────────────────────────────

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ValidationErrors::single("body", rejection.body_text()).into())
}

fn processed() -> Response {
    (StatusCode::OK, Json(PROCESSED_MESSAGE)).into_response()
}

async fn refresh_feature_gauge(state: &AppState) {
    match state.director.feature_count().await {
        Ok(count) => metrics().features_total.set(count as i64),
        Err(e) => tracing::warn!(error = %e, "unable to refresh feature count"),
    }
}

/// A path key of at most ten ASCII digits addresses a feature by friendly id.
enum FeatureKey {
    Id(FeatureId),
    FriendlyId(u32),
}

fn parse_feature_key(raw: &str) -> Result<FeatureKey, ValidationErrors> {
    if !raw.is_empty()
        && raw.len() <= MAX_FRIENDLY_ID_DIGITS
        && raw.bytes().all(|b| b.is_ascii_digit())
    {
        let mut errors = ValidationErrors::new();
        let parsed = raw.parse::<i64>().unwrap_or(i64::MAX);
        return match check_friendly_id(Some(parsed), &mut errors) {
            Some(friendly_id) => Ok(FeatureKey::FriendlyId(friendly_id)),
            None => Err(errors),
        };
    }
    validate::parse_feature_id(raw).map(FeatureKey::Id)
}

// ── Health ───────────────────────────────────────────────────

pub async fn handle_health(State(state): State<Arc<AppState>>) -> ApiResult {
    let count = state.director.feature_count().await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "features_loaded": count
    }))
    .into_response())
}

// ── GET /features ────────────────────────────────────────────

pub async fn list_features(State(state): State<Arc<AppState>>) -> ApiResult<Json<ListResponse>> {
    let items = state.director.all_features().await?;
    Ok(Json(ListResponse { items }))
}

// ── GET /features/{id} (uuid or friendly id) ─────────────────

pub async fn get_feature(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<ItemResponse>> {
    let feature = match parse_feature_key(&key)? {
        FeatureKey::Id(id) => state.director.feature_by_id(id).await?,
        FeatureKey::FriendlyId(friendly_id) => {
            state.director.feature_by_friendly_id(friendly_id).await?
        }
    };
    feature
        .map(|item| Json(ItemResponse { item }))
        .ok_or(ApiError::NotFound)
}

// ── GET /features/name/{name} ────────────────────────────────

pub async fn get_feature_by_name(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<ItemResponse>> {
    if name.trim().is_empty() {
        return Err(ValidationErrors::single(
            "name",
            "The name parameter cannot be empty or whitespace.",
        )
        .into());
    }
    state
        .director
        .feature_by_name(&name)
        .await?
        .map(|item| Json(ItemResponse { item }))
        .ok_or(ApiError::NotFound)
}

// ── POST /features ───────────────────────────────────────────

pub async fn add_feature(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewFeatureRequest>, JsonRejection>,
) -> ApiResult {
    let body = json_body(payload)?;
    let new = validate::validate_new(body.name.as_deref(), body.friendly_id, body.bucket_list)?;
    let (name, friendly_id) = (new.name.clone(), new.friendly_id);

    let id = state.director.add_feature(new).await.inspect_err(|e| {
        tracing::warn!(
            %name,
            friendly_id,
            error = %e,
            "unable to save new feature"
        );
    })?;
    info!(%id, %name, friendly_id, "feature added");
    refresh_feature_gauge(&state).await;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/features/{}", id))],
        Json(id.to_string()),
    )
        .into_response())
}

// ── PUT /features ────────────────────────────────────────────

pub async fn update_feature(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateFeatureRequest>, JsonRejection>,
) -> ApiResult {
    let body = json_body(payload)?;
    let (id, fields) = validate::validate_update(
        body.id.as_deref(),
        body.name.as_deref(),
        body.friendly_id,
        body.bucket_list,
    )?;

    if !state.director.feature_exists(id).await? {
        return Err(ApiError::NotFound);
    }

    let feature = Feature {
        id,
        friendly_id: fields.friendly_id,
        name: fields.name,
        bucket_list: fields.bucket_list,
    };
    state.director.update_feature(feature).await.inspect_err(|e| {
        tracing::warn!(%id, error = %e, "unable to update feature");
    })?;
    info!(%id, "feature updated");
    Ok(processed())
}

// ── DELETE /features/{id} ────────────────────────────────────

pub async fn delete_feature(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id = validate::parse_feature_id(&id)?;
    if !state.director.feature_exists(id).await? {
        return Err(ApiError::NotFound);
    }
    state.director.delete_feature(id).await?;
    info!(%id, "feature deleted");
    refresh_feature_gauge(&state).await;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ── Bucket sub-resource ──────────────────────────────────────

pub async fn get_bucket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let id = validate::parse_feature_id(&id)?;
    Ok(Json(state.director.bucket_list(id).await?))
}

pub async fn query_bucket(
    State(state): State<Arc<AppState>>,
    Path((id, bucket_id)): Path<(String, String)>,
) -> ApiResult<Json<bool>> {
    let id = validate::parse_feature_id(&id)?;
    let bucket_id = validate::parse_bucket_id(&bucket_id)?;
    Ok(Json(state.director.bucket_contains(id, bucket_id).await?))
}

pub async fn add_to_bucket(
    State(state): State<Arc<AppState>>,
    Path((id, bucket_id)): Path<(String, String)>,
) -> ApiResult {
    let id = validate::parse_feature_id(&id)?;
    let bucket_id = validate::parse_bucket_id(&bucket_id)?;
    state.director.add_to_bucket(id, bucket_id).await?;
    Ok(processed())
}

/// Removes one bucket id, or empties the list when the segment is `clear`.
pub async fn remove_from_bucket(
    State(state): State<Arc<AppState>>,
    Path((id, bucket_id)): Path<(String, String)>,
) -> ApiResult {
    let id = validate::parse_feature_id(&id)?;
    if bucket_id == CLEAR_SEGMENT {
        state.director.clear_bucket(id).await?;
        info!(%id, "bucket cleared");
        return Ok(processed());
    }
    let bucket_id = validate::parse_bucket_id(&bucket_id)?;
    state.director.remove_from_bucket(id, bucket_id).await?;
    Ok(processed())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use featureswitch_lib::{FeatureStore, NewFeature, StoreError, StoreResult};

    use super::*;

    /// Store whose every call fails with a storage fault.
    struct UnavailableStore;

    fn unavailable<T>() -> StoreResult<T> {
        Err(StoreError::permanent("store offline"))
    }

    #[async_trait]
    impl FeatureStore for UnavailableStore {
        async fn get_by_id(&self, _id: FeatureId) -> StoreResult<Option<Feature>> {
            unavailable()
        }
        async fn get_by_friendly_id(&self, _friendly_id: u32) -> StoreResult<Option<Feature>> {
            unavailable()
        }
        async fn get_by_name(&self, _name: &str) -> StoreResult<Option<Feature>> {
            unavailable()
        }
        async fn exists_by_id(&self, _id: FeatureId) -> StoreResult<bool> {
            unavailable()
        }
        async fn exists_by_friendly_id(&self, _friendly_id: u32) -> StoreResult<bool> {
            unavailable()
        }
        async fn list_all(&self) -> StoreResult<Vec<Feature>> {
            unavailable()
        }
        async fn insert(&self, _feature: NewFeature) -> StoreResult<FeatureId> {
            unavailable()
        }
        async fn update(&self, _feature: Feature) -> StoreResult<()> {
            unavailable()
        }
        async fn delete(&self, _id: FeatureId) -> StoreResult<bool> {
            unavailable()
        }
        async fn count(&self) -> StoreResult<usize> {
            unavailable()
        }
    }

    #[tokio::test]
    async fn test_count_failure_is_reported_not_swallowed() {
        let state = Arc::new(AppState::new(Arc::new(UnavailableStore)));

        // gauge refresh logs the failure and leaves the request path alone
        refresh_feature_gauge(&state).await;

        let resp = handle_health(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_parse_feature_key() {
        assert!(matches!(
            parse_feature_key("42"),
            Ok(FeatureKey::FriendlyId(42))
        ));
        assert!(parse_feature_key("0").is_err());
        assert!(parse_feature_key("9999999999").is_err());

        let id = FeatureId::generate();
        assert!(matches!(
            parse_feature_key(&id.to_string()),
            Ok(FeatureKey::Id(parsed)) if parsed == id
        ));
        assert!(matches!(
            parse_feature_key(&id.to_string().replace('-', "")),
            Ok(FeatureKey::Id(parsed)) if parsed == id
        ));
        let all_digits = "12345678901234567890123456789012";
        assert!(matches!(
            parse_feature_key(all_digits),
            Ok(FeatureKey::Id(parsed)) if parsed.to_string().replace('-', "") == all_digits
        ));
        assert!(parse_feature_key("-1").is_err());
        assert!(parse_feature_key("nonsense").is_err());
    }
}
