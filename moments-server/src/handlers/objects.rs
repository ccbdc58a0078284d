//! Signed object retrieval handler
//!
//! Serves stored bytes for URLs minted by the object store. Every
//! request must carry a valid, unexpired signature over the key.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::StorageError;

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub sig: String,
}

/// GET /objects/{key} - fetch stored bytes through a signed URL
pub async fn get_object_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.storage.verify_signature(&key, query.expires, &query.sig) {
        return Err(ApiError::bad_request("Invalid or expired object signature"));
    }

    let bytes = match state.storage.get(&key).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => {
            return Err(ApiError::not_found(format!("object {key}")));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
