use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use recordbook_core::{Collection, Record, StoreError};
use serde_json::Value;

use crate::{server::AppState, storage::Replaced};

/// Storage failure surfaced by a handler.
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            StoreError::DuplicateKey { collection, key } => {
                tracing::debug!(%collection, %key, "Rejected duplicate key");
                StatusCode::CONFLICT.into_response()
            }
            e => {
                tracing::error!(error = %e, "Storage failure");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Bodies that are empty, malformed or not an object count as `{}`.
pub fn record_from_body(body: &[u8]) -> Record {
    serde_json::from_slice::<Value>(body)
        .map(Record::from)
        .unwrap_or_default()
}

/// `/api/{collection}`: list and create.
pub async fn collection(
    State(state): State<AppState>,
    method: Method,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let Ok(collection) = name.parse::<Collection>() else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    match method {
        Method::GET => Ok(Json(state.storage.read(collection).await).into_response()),
        Method::POST => {
            let stored = state.storage.create(collection, record_from_body(&body)).await?;
            Ok((StatusCode::CREATED, Json(stored)).into_response())
        }
        _ => Ok(StatusCode::METHOD_NOT_ALLOWED.into_response()),
    }
}

/// `/api/{collection}/{key}`: replace and delete.
pub async fn record(
    State(state): State<AppState>,
    method: Method,
    Path((name, key)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let Ok(collection) = name.parse::<Collection>() else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    match method {
        Method::PUT => {
            let body = match state.storage.replace(collection, &key, record_from_body(&body)).await? {
                Replaced::Stored(record) => record,
                Replaced::NotFound(record) => {
                    tracing::warn!(%collection, %key, "PUT for unknown key, nothing stored");
                    record
                }
            };
            Ok(Json(body).into_response())
        }
        Method::DELETE => {
            state.storage.remove(collection, &key).await?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        _ => Ok(StatusCode::METHOD_NOT_ALLOWED.into_response()),
    }
}
