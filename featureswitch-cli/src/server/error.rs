use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use featureswitch_lib::{StoreError, ValidationErrors};
use tracing::{error, warn};

use super::metrics::metrics;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error - See server logs for more info.";

/// Everything a handler can fail with, mapped onto HTTP status codes.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing request field (400).
    Validation(ValidationErrors),
    /// The addressed feature does not exist (404).
    NotFound,
    /// Failure reported by the store.
    Store(StoreError),
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        ApiError::Validation(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

fn bad_request(field: &str, message: String) -> Response {
    let body = BTreeMap::from([(field, message)]);
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                warn!(%errors, "request rejected");
                (StatusCode::BAD_REQUEST, Json(errors.into_fields())).into_response()
            }
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Store(e) => {
                metrics().store_errors.with_label_values(&[e.kind()]).inc();
                match e {
                    StoreError::NotFound(id) => {
                        warn!(%id, "feature not found");
                        StatusCode::NOT_FOUND.into_response()
                    }
                    StoreError::DuplicateKey { field, .. } => {
                        warn!(error = %e, "uniqueness violation");
                        bad_request(field.as_str(), e.to_string())
                    }
                    StoreError::MissingId => {
                        warn!(error = %e, "update without id");
                        bad_request("id", e.to_string())
                    }
                    StoreError::Storage { .. } | StoreError::Corrupt(_) => {
                        error!(error = %e, kind = e.kind(), "store failure");
                        (StatusCode::INTERNAL_SERVER_ERROR, Json(INTERNAL_ERROR_MESSAGE))
                            .into_response()
                    }
                }
            }
        }
    }
}
