//! In-memory metadata store backend.
//!
//! Development fallback and test double for the PostgreSQL backend.
//! A recognition callback for one photo runs entirely under that
//! photo's `DashMap` match entry, preview write included, which
//! serializes it end to end the same way the advisory-lock transaction
//! does on the PostgreSQL side.

use std::collections::HashMap;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{
    Facecam, FacecamAsset, InteractionFlags, NewFacecam, NewPhoto, NewPhotoDetail, Photo,
    PhotoDetail, PreviewUrls, SimilarPhoto, SimilarUser, StoreError, UserSimilarPhoto,
};

#[derive(Default)]
pub struct MemoryPhotoStore {
    photos: DashMap<Uuid, Photo>,
    details: DashMap<Uuid, Vec<PhotoDetail>>,
    /// photo id -> user id -> match row
    matches: DashMap<Uuid, HashMap<Uuid, UserSimilarPhoto>>,
    facecams: DashMap<Uuid, Facecam>,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_photo(
        &self,
        photo: NewPhoto,
        detail: NewPhotoDetail,
    ) -> Result<(Uuid, Uuid), StoreError> {
        if self.photos.contains_key(&photo.id) {
            return Err(StoreError::Conflict(format!(
                "photo {} already exists",
                photo.id
            )));
        }
        if detail.photo_id != photo.id {
            return Err(StoreError::Conflict(
                "detail does not reference the created photo".into(),
            ));
        }

        let now = Utc::now();
        let photo_id = photo.id;
        self.photos.insert(
            photo_id,
            Photo {
                id: photo.id,
                creator_id: photo.creator_id,
                title: photo.title,
                collection_url: photo.collection_url,
                price: photo.price,
                price_str: photo.price_str,
                is_this_you_url: None,
                your_moments_url: None,
                original_at: photo.original_at,
                created_at: now,
                updated_at: now,
            },
        );
        let detail_id = self.insert_detail(detail);
        Ok((photo_id, detail_id))
    }

    pub fn add_photo_detail(&self, detail: NewPhotoDetail) -> Result<Uuid, StoreError> {
        if !self.photos.contains_key(&detail.photo_id) {
            return Err(StoreError::NotFound(format!("photo {}", detail.photo_id)));
        }
        Ok(self.insert_detail(detail))
    }

    fn insert_detail(&self, detail: NewPhotoDetail) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.details.entry(detail.photo_id).or_default().push(PhotoDetail {
            id,
            photo_id: detail.photo_id,
            file_name: detail.file_name,
            file_key: detail.file_key,
            size: detail.size,
            format: detail.format,
            checksum: detail.checksum,
            width: detail.width,
            height: detail.height,
            url: detail.url,
            kind: detail.kind,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn get_photo(&self, id: Uuid) -> Option<Photo> {
        self.photos.get(&id).map(|p| p.clone())
    }

    pub fn photo_details(&self, photo_id: Uuid) -> Vec<PhotoDetail> {
        self.details
            .get(&photo_id)
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn apply_photo_recognition(
        &self,
        photo_id: Uuid,
        preview: &PreviewUrls,
        target: &[SimilarUser],
    ) -> Result<(), StoreError> {
        // The match entry guard is held across the preview write AND
        // the reconciliation, so the two are one serialized unit: no
        // reader or concurrent callback can observe a new preview
        // paired with an old match set.
        let mut entry = self.matches.entry(photo_id).or_default();

        let Some(mut photo) = self.photos.get_mut(&photo_id) else {
            let was_empty = entry.is_empty();
            drop(entry);
            if was_empty {
                self.matches.remove_if(&photo_id, |_, rows| rows.is_empty());
            }
            return Err(StoreError::NotFound(format!("photo {photo_id}")));
        };

        let now = Utc::now();
        if let Some(ref url) = preview.is_this_you_url {
            photo.is_this_you_url = Some(url.clone());
        }
        if let Some(ref url) = preview.your_moments_url {
            photo.your_moments_url = Some(url.clone());
        }
        photo.updated_at = now;
        drop(photo);

        if target.is_empty() {
            entry.clear();
            return Ok(());
        }

        entry.retain(|user_id, _| target.iter().any(|m| m.user_id == *user_id));

        for m in target {
            entry
                .entry(m.user_id)
                .and_modify(|row| {
                    // Flags survive a re-match; only the level and
                    // timestamp move.
                    row.similarity = m.similarity;
                    row.updated_at = now;
                })
                .or_insert_with(|| UserSimilarPhoto {
                    id: Uuid::new_v4(),
                    photo_id,
                    user_id: m.user_id,
                    similarity: m.similarity,
                    is_wishlist: false,
                    is_resend: false,
                    is_cart: false,
                    is_favorite: false,
                    created_at: now,
                    updated_at: now,
                });
        }

        Ok(())
    }

    pub fn similar_users(&self, photo_id: Uuid) -> Vec<UserSimilarPhoto> {
        let mut rows: Vec<UserSimilarPhoto> = self
            .matches
            .get(&photo_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by_key(|r| r.user_id);
        rows
    }

    pub fn set_interaction_flags(
        &self,
        photo_id: Uuid,
        user_id: Uuid,
        flags: InteractionFlags,
    ) -> bool {
        if let Some(mut entry) = self.matches.get_mut(&photo_id) {
            if let Some(row) = entry.get_mut(&user_id) {
                row.is_wishlist = flags.is_wishlist;
                row.is_resend = flags.is_resend;
                row.is_cart = flags.is_cart;
                row.is_favorite = flags.is_favorite;
                row.updated_at = Utc::now();
                return true;
            }
        }
        false
    }

    pub fn create_facecam(&self, facecam: NewFacecam) -> Uuid {
        let now = Utc::now();
        let user_id = facecam.user_id;
        // One facecam per user: a re-upload replaces the previous row.
        let row = Facecam {
            id: facecam.id,
            user_id,
            title: facecam.title,
            file_name: facecam.file_name,
            file_key: facecam.file_key,
            size: facecam.size,
            checksum: facecam.checksum,
            url: facecam.url,
            is_processed: false,
            original_at: facecam.original_at,
            created_at: now,
            updated_at: now,
        };
        let id = row.id;
        self.facecams.insert(user_id, row);
        id
    }

    pub fn get_facecam(&self, user_id: Uuid) -> Option<Facecam> {
        self.facecams.get(&user_id).map(|f| f.clone())
    }

    pub fn update_facecam_asset(
        &self,
        user_id: Uuid,
        asset: FacecamAsset,
    ) -> Result<(), StoreError> {
        let mut facecam = self
            .facecams
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("facecam for user {user_id}")))?;
        facecam.file_name = asset.file_name;
        facecam.file_key = asset.file_key;
        facecam.size = asset.size;
        facecam.checksum = asset.checksum;
        facecam.url = asset.url;
        facecam.updated_at = Utc::now();
        Ok(())
    }

    pub fn apply_facecam_recognition(
        &self,
        user_id: Uuid,
        target: &[SimilarPhoto],
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        {
            let mut facecam = self
                .facecams
                .get_mut(&user_id)
                .ok_or_else(|| StoreError::NotFound(format!("facecam for user {user_id}")))?;
            facecam.is_processed = true;
            facecam.updated_at = now;
        }

        // Per-user reconciliation touches one user's rows across photos.
        let target_photo_ids: Vec<Uuid> = target.iter().map(|m| m.photo_id).collect();
        for mut entry in self.matches.iter_mut() {
            if !target_photo_ids.contains(entry.key()) {
                entry.value_mut().remove(&user_id);
            }
        }

        for m in target {
            let mut entry = self.matches.entry(m.photo_id).or_default();
            entry
                .entry(user_id)
                .and_modify(|row| {
                    row.similarity = m.similarity;
                    row.updated_at = now;
                })
                .or_insert_with(|| UserSimilarPhoto {
                    id: Uuid::new_v4(),
                    photo_id: m.photo_id,
                    user_id,
                    similarity: m.similarity,
                    is_wishlist: false,
                    is_resend: false,
                    is_cart: false,
                    is_favorite: false,
                    created_at: now,
                    updated_at: now,
                });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{RepresentationKind, SimilarityLevel};

    fn sample_photo(id: Uuid) -> (NewPhoto, NewPhotoDetail) {
        let photo = NewPhoto {
            id,
            creator_id: Uuid::new_v4(),
            title: "a.jpg".into(),
            collection_url: "http://store/photo/a.jpg".into(),
            price: 133,
            price_str: "133".into(),
            original_at: Utc::now(),
        };
        let detail = NewPhotoDetail {
            photo_id: id,
            file_name: "a.jpg".into(),
            file_key: "photo/abc_a.jpg".into(),
            size: 1024,
            format: "JPG".into(),
            checksum: "deadbeef".into(),
            width: 1000,
            height: 800,
            url: "http://store/photo/a.jpg".into(),
            kind: RepresentationKind::Collection,
        };
        (photo, detail)
    }

    fn matches(pairs: &[(Uuid, SimilarityLevel)]) -> Vec<SimilarUser> {
        pairs
            .iter()
            .map(|&(user_id, similarity)| SimilarUser {
                user_id,
                similarity,
            })
            .collect()
    }

    #[test]
    fn test_create_photo_with_collection_detail() {
        let store = MemoryPhotoStore::new();
        let id = Uuid::new_v4();
        let (photo, detail) = sample_photo(id);

        let (photo_id, _) = store.create_photo(photo, detail).unwrap();
        assert_eq!(photo_id, id);

        let details = store.photo_details(id);
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].kind, RepresentationKind::Collection);
        assert_eq!((details[0].width, details[0].height), (1000, 800));

        // Preview URLs are never written by the create path
        let stored = store.get_photo(id).unwrap();
        assert!(stored.is_this_you_url.is_none());
        assert!(stored.your_moments_url.is_none());
    }

    #[test]
    fn test_duplicate_photo_id_is_conflict() {
        let store = MemoryPhotoStore::new();
        let id = Uuid::new_v4();
        let (photo, detail) = sample_photo(id);
        store.create_photo(photo.clone(), detail.clone()).unwrap();

        assert!(matches!(
            store.create_photo(photo, detail),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_compressed_detail_requires_existing_photo() {
        let store = MemoryPhotoStore::new();
        let id = Uuid::new_v4();
        let (photo, detail) = sample_photo(id);
        store.create_photo(photo, detail.clone()).unwrap();

        let compressed = NewPhotoDetail {
            kind: RepresentationKind::Compressed,
            file_key: "photo/def_small.jpg".into(),
            ..detail.clone()
        };
        store.add_photo_detail(compressed).unwrap();

        let kinds: Vec<_> = store.photo_details(id).iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![RepresentationKind::Collection, RepresentationKind::Compressed]
        );

        let orphan = NewPhotoDetail {
            photo_id: Uuid::new_v4(),
            ..detail
        };
        assert!(matches!(
            store.add_photo_detail(orphan),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_reconcile_replaces_dropped_users() {
        let store = MemoryPhotoStore::new();
        let p1 = Uuid::new_v4();
        let (photo, detail) = sample_photo(p1);
        store.create_photo(photo, detail).unwrap();

        let (u1, u2, u3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store
            .apply_photo_recognition(
                p1,
                &PreviewUrls::default(),
                &matches(&[(u1, SimilarityLevel::High), (u2, SimilarityLevel::Low)]),
            )
            .unwrap();

        store
            .apply_photo_recognition(
                p1,
                &PreviewUrls::default(),
                &matches(&[(u2, SimilarityLevel::High), (u3, SimilarityLevel::Low)]),
            )
            .unwrap();

        let rows = store.similar_users(p1);
        assert_eq!(rows.len(), 2);
        assert!(!rows.iter().any(|r| r.user_id == u1));
        let u2_row = rows.iter().find(|r| r.user_id == u2).unwrap();
        assert_eq!(u2_row.similarity, SimilarityLevel::High);
        let u3_row = rows.iter().find(|r| r.user_id == u3).unwrap();
        assert_eq!(u3_row.similarity, SimilarityLevel::Low);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let store = MemoryPhotoStore::new();
        let p1 = Uuid::new_v4();
        let (photo, detail) = sample_photo(p1);
        store.create_photo(photo, detail).unwrap();

        let u1 = Uuid::new_v4();
        let target = matches(&[(u1, SimilarityLevel::Medium)]);

        store
            .apply_photo_recognition(p1, &PreviewUrls::default(), &target)
            .unwrap();
        let first = store.similar_users(p1);

        store
            .apply_photo_recognition(p1, &PreviewUrls::default(), &target)
            .unwrap();
        let second = store.similar_users(p1);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        // Same row, not a new one
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].created_at, second[0].created_at);
    }

    #[test]
    fn test_reconcile_preserves_interaction_flags() {
        let store = MemoryPhotoStore::new();
        let p1 = Uuid::new_v4();
        let (photo, detail) = sample_photo(p1);
        store.create_photo(photo, detail).unwrap();

        let u1 = Uuid::new_v4();
        store
            .apply_photo_recognition(
                p1,
                &PreviewUrls::default(),
                &matches(&[(u1, SimilarityLevel::Low)]),
            )
            .unwrap();

        assert!(store.set_interaction_flags(
            p1,
            u1,
            InteractionFlags {
                is_favorite: true,
                ..Default::default()
            }
        ));

        // Re-match at a different level must not reset the flag
        store
            .apply_photo_recognition(
                p1,
                &PreviewUrls::default(),
                &matches(&[(u1, SimilarityLevel::High)]),
            )
            .unwrap();

        let rows = store.similar_users(p1);
        assert_eq!(rows[0].similarity, SimilarityLevel::High);
        assert!(rows[0].is_favorite);
        assert!(!rows[0].is_wishlist);
    }

    #[test]
    fn test_empty_target_clears_all_rows() {
        let store = MemoryPhotoStore::new();
        let p1 = Uuid::new_v4();
        let (photo, detail) = sample_photo(p1);
        store.create_photo(photo, detail).unwrap();

        store
            .apply_photo_recognition(
                p1,
                &PreviewUrls::default(),
                &matches(&[
                    (Uuid::new_v4(), SimilarityLevel::High),
                    (Uuid::new_v4(), SimilarityLevel::Low),
                ]),
            )
            .unwrap();
        assert_eq!(store.similar_users(p1).len(), 2);

        store
            .apply_photo_recognition(p1, &PreviewUrls::default(), &[])
            .unwrap();
        assert!(store.similar_users(p1).is_empty());
    }

    #[test]
    fn test_recognition_updates_preview_urls() {
        let store = MemoryPhotoStore::new();
        let p1 = Uuid::new_v4();
        let (photo, detail) = sample_photo(p1);
        store.create_photo(photo, detail).unwrap();

        store
            .apply_photo_recognition(
                p1,
                &PreviewUrls {
                    is_this_you_url: Some("http://cdn/ity.jpg".into()),
                    your_moments_url: Some("http://cdn/ym.jpg".into()),
                },
                &[],
            )
            .unwrap();

        let stored = store.get_photo(p1).unwrap();
        assert_eq!(stored.is_this_you_url.as_deref(), Some("http://cdn/ity.jpg"));
        assert_eq!(stored.your_moments_url.as_deref(), Some("http://cdn/ym.jpg"));
    }

    #[test]
    fn test_concurrent_recognition_keeps_preview_and_matches_paired() {
        let store = MemoryPhotoStore::new();
        let p1 = Uuid::new_v4();
        let (photo, detail) = sample_photo(p1);
        store.create_photo(photo, detail).unwrap();

        let (ua, ub) = (Uuid::new_v4(), Uuid::new_v4());
        let preview_a = PreviewUrls {
            is_this_you_url: Some("http://cdn/a.jpg".into()),
            your_moments_url: None,
        };
        let preview_b = PreviewUrls {
            is_this_you_url: Some("http://cdn/b.jpg".into()),
            your_moments_url: None,
        };

        // Two callbacks for the same photo racing each other: whichever
        // lands last must win both the preview URL and the match set.
        for _ in 0..200 {
            std::thread::scope(|s| {
                s.spawn(|| {
                    store
                        .apply_photo_recognition(
                            p1,
                            &preview_a,
                            &matches(&[(ua, SimilarityLevel::High)]),
                        )
                        .unwrap();
                });
                s.spawn(|| {
                    store
                        .apply_photo_recognition(
                            p1,
                            &preview_b,
                            &matches(&[(ub, SimilarityLevel::High)]),
                        )
                        .unwrap();
                });
            });

            let preview = store.get_photo(p1).unwrap().is_this_you_url.unwrap();
            let rows = store.similar_users(p1);
            assert_eq!(rows.len(), 1);
            let winner = if preview == "http://cdn/a.jpg" { ua } else { ub };
            assert_eq!(
                rows[0].user_id, winner,
                "preview URL and match set must come from the same callback"
            );
        }
    }

    #[test]
    fn test_recognition_for_missing_photo_is_not_found() {
        let store = MemoryPhotoStore::new();
        assert!(matches!(
            store.apply_photo_recognition(Uuid::new_v4(), &PreviewUrls::default(), &[]),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_facecam_asset_repoints_row() {
        let store = MemoryPhotoStore::new();
        let user = Uuid::new_v4();

        let asset = FacecamAsset {
            file_name: "small.jpg".into(),
            file_key: "facecam/abc_small.jpg".into(),
            size: 512,
            checksum: "beef".into(),
            url: "http://store/facecam/abc_small.jpg".into(),
        };
        assert!(matches!(
            store.update_facecam_asset(user, asset.clone()),
            Err(StoreError::NotFound(_))
        ));

        store.create_facecam(NewFacecam {
            id: Uuid::new_v4(),
            user_id: user,
            title: "face.jpg".into(),
            file_name: "face.jpg".into(),
            file_key: "facecam/xyz_face.jpg".into(),
            size: 2048,
            checksum: "cafe".into(),
            url: "http://store/facecam/xyz_face.jpg".into(),
            original_at: Utc::now(),
        });

        store.update_facecam_asset(user, asset).unwrap();
        let row = store.get_facecam(user).unwrap();
        assert_eq!(row.file_key, "facecam/abc_small.jpg");
        assert_eq!(row.checksum, "beef");
        assert_eq!(row.size, 512);
        // Identity and ownership are untouched by the re-point.
        assert_eq!(row.title, "face.jpg");
        assert!(!row.is_processed);
    }

    #[test]
    fn test_facecam_recognition_reconciles_by_user() {
        let store = MemoryPhotoStore::new();
        let user = Uuid::new_v4();
        let (pa, pb) = (Uuid::new_v4(), Uuid::new_v4());
        for pid in [pa, pb] {
            let (photo, detail) = sample_photo(pid);
            store.create_photo(photo, detail).unwrap();
        }

        store.create_facecam(NewFacecam {
            id: Uuid::new_v4(),
            user_id: user,
            title: "face.jpg".into(),
            file_name: "face.jpg".into(),
            file_key: "facecam/xyz_face.jpg".into(),
            size: 100,
            checksum: "cafe".into(),
            url: "http://store/facecam/xyz_face.jpg".into(),
            original_at: Utc::now(),
        });

        store
            .apply_facecam_recognition(
                user,
                &[
                    SimilarPhoto {
                        photo_id: pa,
                        similarity: SimilarityLevel::High,
                    },
                    SimilarPhoto {
                        photo_id: pb,
                        similarity: SimilarityLevel::Low,
                    },
                ],
            )
            .unwrap();

        assert!(store.get_facecam(user).unwrap().is_processed);
        assert_eq!(store.similar_users(pa).len(), 1);
        assert_eq!(store.similar_users(pb).len(), 1);

        // Dropping photo B from the target removes only that edge
        store
            .apply_facecam_recognition(
                user,
                &[SimilarPhoto {
                    photo_id: pa,
                    similarity: SimilarityLevel::High,
                }],
            )
            .unwrap();
        assert_eq!(store.similar_users(pa).len(), 1);
        assert!(store.similar_users(pb).is_empty());
    }
}
