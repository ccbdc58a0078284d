//! User-to-photo similarity edges and reconciliation inputs.
//!
//! A `UserSimilarPhoto` row links a photo to a user the recognition
//! process matched against it. Rows are created and refreshed only by
//! reconciliation; interaction flags on an existing row survive every
//! re-match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Similarity classification produced by the recognition process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimilarityLevel {
    Low,
    Medium,
    High,
}

impl SimilarityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for SimilarityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SimilarityLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(format!("unknown similarity level: {other}")),
        }
    }
}

/// Persisted similarity edge between a photo and a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserSimilarPhoto {
    pub id: Uuid,
    pub photo_id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub similarity: SimilarityLevel,
    pub is_wishlist: bool,
    pub is_resend: bool,
    pub is_cart: bool,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of a per-photo target set: a user and their match level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SimilarUser {
    pub user_id: Uuid,
    pub similarity: SimilarityLevel,
}

/// One entry of a per-user target set: a photo and its match level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SimilarPhoto {
    pub photo_id: Uuid,
    pub similarity: SimilarityLevel,
}

/// Boolean interaction state owned by the user, preserved across re-matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InteractionFlags {
    pub is_wishlist: bool,
    pub is_resend: bool,
    pub is_cart: bool,
    pub is_favorite: bool,
}

/// Replacement preview URLs carried by the recognition callback.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PreviewUrls {
    pub is_this_you_url: Option<String>,
    pub your_moments_url: Option<String>,
}

impl PreviewUrls {
    pub fn is_empty(&self) -> bool {
        self.is_this_you_url.is_none() && self.your_moments_url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_round_trip() {
        for level in [
            SimilarityLevel::Low,
            SimilarityLevel::Medium,
            SimilarityLevel::High,
        ] {
            assert_eq!(
                SimilarityLevel::try_from(level.as_str().to_string()).unwrap(),
                level
            );
        }
    }

    #[test]
    fn test_similarity_wire_format() {
        let m: SimilarUser = serde_json::from_str(
            r#"{"user_id":"550e8400-e29b-41d4-a716-446655440000","similarity":"HIGH"}"#,
        )
        .unwrap();
        assert_eq!(m.similarity, SimilarityLevel::High);
    }

    #[test]
    fn test_preview_urls_emptiness() {
        assert!(PreviewUrls::default().is_empty());
        assert!(!PreviewUrls {
            your_moments_url: Some("https://cdn/x".into()),
            ..Default::default()
        }
        .is_empty());
    }
}
