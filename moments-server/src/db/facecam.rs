//! Facecam entity.
//!
//! A facecam is a single-asset upload owned by one user, used as the
//! reference face for recognition. There is no detail fan-out: the row
//! carries the stored copy directly, and at most one row exists per
//! user (upsert on user id).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Facecam entity from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Facecam {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub file_key: String,
    pub size: i64,
    pub checksum: String,
    pub url: String,
    /// Set once the recognition process has consumed this facecam.
    pub is_processed: bool,
    pub original_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating (or replacing) a user's facecam
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewFacecam {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub file_key: String,
    pub size: i64,
    pub checksum: String,
    pub url: String,
    pub original_at: DateTime<Utc>,
}

/// DTO for re-pointing a facecam at a different stored copy.
///
/// Written by the detached compression stage once the compressed copy
/// is durable, so the row always references the object recognition
/// will be served.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FacecamAsset {
    pub file_name: String,
    pub file_key: String,
    pub size: i64,
    pub checksum: String,
    pub url: String,
}
