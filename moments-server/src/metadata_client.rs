//! Metadata service client.
//!
//! The ingestion flow records photo and facecam rows through this
//! client rather than touching `PhotoStore` directly, so the metadata
//! side can run in-process or as a separate deployment without the
//! ingestion code changing. Two backends:
//!
//! - **Local**: calls straight into a shared `PhotoStore`.
//! - **Remote**: JSON over HTTP against another instance's `/internal`
//!   routes, with a per-call timeout.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{FacecamAsset, NewFacecam, NewPhoto, NewPhotoDetail, PhotoStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum MetadataClientError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Metadata transport error: {0}")]
    Transport(String),

    #[error("Metadata service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Wire request for creating a photo with its first representation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePhotoRequest {
    pub photo: NewPhoto,
    pub detail: NewPhotoDetail,
}

/// Wire response carrying the created row ids.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePhotoResponse {
    pub photo_id: Uuid,
    pub detail_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDetailResponse {
    pub detail_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateFacecamResponse {
    pub facecam_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateFacecamAssetResponse {
    pub updated: bool,
}

enum ClientBackend {
    Local(Arc<PhotoStore>),
    Remote {
        http: reqwest::Client,
        base_url: String,
    },
}

pub struct MetadataClient {
    backend: ClientBackend,
}

impl MetadataClient {
    /// In-process client over a shared store.
    pub fn local(store: Arc<PhotoStore>) -> Self {
        Self {
            backend: ClientBackend::Local(store),
        }
    }

    /// HTTP client against a remote metadata deployment.
    pub fn remote(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MetadataClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataClientError::Transport(e.to_string()))?;
        Ok(Self {
            backend: ClientBackend::Remote {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
            },
        })
    }

    pub async fn create_photo(
        &self,
        photo: NewPhoto,
        detail: NewPhotoDetail,
    ) -> Result<(Uuid, Uuid), MetadataClientError> {
        match &self.backend {
            ClientBackend::Local(store) => Ok(store.create_photo(photo, detail).await?),
            ClientBackend::Remote { http, base_url } => {
                let resp: CreatePhotoResponse = post_json(
                    http,
                    &format!("{base_url}/internal/photos"),
                    &CreatePhotoRequest { photo, detail },
                )
                .await?;
                Ok((resp.photo_id, resp.detail_id))
            }
        }
    }

    pub async fn add_photo_detail(
        &self,
        detail: NewPhotoDetail,
    ) -> Result<Uuid, MetadataClientError> {
        match &self.backend {
            ClientBackend::Local(store) => Ok(store.add_photo_detail(detail).await?),
            ClientBackend::Remote { http, base_url } => {
                let resp: CreateDetailResponse = post_json(
                    http,
                    &format!("{base_url}/internal/photo-details"),
                    &detail,
                )
                .await?;
                Ok(resp.detail_id)
            }
        }
    }

    pub async fn create_facecam(&self, facecam: NewFacecam) -> Result<Uuid, MetadataClientError> {
        match &self.backend {
            ClientBackend::Local(store) => Ok(store.create_facecam(facecam).await?),
            ClientBackend::Remote { http, base_url } => {
                let resp: CreateFacecamResponse =
                    post_json(http, &format!("{base_url}/internal/facecams"), &facecam).await?;
                Ok(resp.facecam_id)
            }
        }
    }

    /// Re-point a user's facecam at the compressed stored copy.
    pub async fn update_facecam_asset(
        &self,
        user_id: Uuid,
        asset: FacecamAsset,
    ) -> Result<(), MetadataClientError> {
        match &self.backend {
            ClientBackend::Local(store) => Ok(store.update_facecam_asset(user_id, asset).await?),
            ClientBackend::Remote { http, base_url } => {
                let _: UpdateFacecamAssetResponse = send_json(
                    http.put(format!("{base_url}/internal/facecams/{user_id}/asset")),
                    &asset,
                )
                .await?;
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for MetadataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            ClientBackend::Local(_) => "Local",
            ClientBackend::Remote { .. } => "Remote",
        };
        f.debug_struct("MetadataClient")
            .field("backend", &backend)
            .finish()
    }
}

async fn post_json<B, R>(http: &reqwest::Client, url: &str, body: &B) -> Result<R, MetadataClientError>
where
    B: Serialize,
    R: for<'de> Deserialize<'de>,
{
    send_json(http.post(url), body).await
}

async fn send_json<B, R>(
    request: reqwest::RequestBuilder,
    body: &B,
) -> Result<R, MetadataClientError>
where
    B: Serialize,
    R: for<'de> Deserialize<'de>,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| MetadataClientError::Transport(e.to_string()))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(MetadataClientError::NotFound("resource".into()));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(MetadataClientError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| MetadataClientError::Transport(e.to_string()))
}
