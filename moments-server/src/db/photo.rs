//! Photo and PhotoDetail entities.
//!
//! A `Photo` is the purchasable asset; each `PhotoDetail` row is one
//! physical representation of it (the original collection copy, the
//! compressed copy, or a profile variant).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Tag distinguishing the physical representations of one photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepresentationKind {
    /// The original upload, servable as the collection asset.
    Collection,
    /// The quality-reduced copy produced by the detached path.
    Compressed,
    /// Profile-image variant.
    Profile,
}

impl RepresentationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "COLLECTION",
            Self::Compressed => "COMPRESSED",
            Self::Profile => "PROFILE",
        }
    }
}

impl std::fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for RepresentationKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "COLLECTION" => Ok(Self::Collection),
            "COMPRESSED" => Ok(Self::Compressed),
            "PROFILE" => Ok(Self::Profile),
            other => Err(format!("unknown representation kind: {other}")),
        }
    }
}

/// Photo entity from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Photo {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub collection_url: String,
    pub price: i64,
    pub price_str: String,
    /// Written only by the recognition callback, never by the create path.
    pub is_this_you_url: Option<String>,
    /// Written only by the recognition callback, never by the create path.
    pub your_moments_url: Option<String>,
    pub original_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating a new photo
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPhoto {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub collection_url: String,
    pub price: i64,
    pub price_str: String,
    pub original_at: DateTime<Utc>,
}

/// PhotoDetail entity from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PhotoDetail {
    pub id: Uuid,
    pub photo_id: Uuid,
    pub file_name: String,
    pub file_key: String,
    pub size: i64,
    pub format: String,
    pub checksum: String,
    pub width: i32,
    pub height: i32,
    pub url: String,
    #[sqlx(try_from = "String")]
    pub kind: RepresentationKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for attaching a representation to a photo
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPhotoDetail {
    pub photo_id: Uuid,
    pub file_name: String,
    pub file_key: String,
    pub size: i64,
    pub format: String,
    pub checksum: String,
    pub width: i32,
    pub height: i32,
    pub url: String,
    pub kind: RepresentationKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            RepresentationKind::Collection,
            RepresentationKind::Compressed,
            RepresentationKind::Profile,
        ] {
            let parsed = RepresentationKind::try_from(kind.as_str().to_string()).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_kind_rejects_unknown_tag() {
        assert!(RepresentationKind::try_from("THUMBNAIL".to_string()).is_err());
    }

    #[test]
    fn test_kind_wire_format() {
        let json = serde_json::to_string(&RepresentationKind::Collection).unwrap();
        assert_eq!(json, "\"COLLECTION\"");
    }
}
