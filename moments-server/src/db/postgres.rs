//! PostgreSQL metadata store backend.
//!
//! Reconciliation executes as parameterized multi-row statements (an
//! array-bound delete followed by an `UNNEST` upsert) inside a single
//! transaction that holds a per-photo advisory lock, so two concurrent
//! callbacks for the same photo cannot interleave their diffs.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    Facecam, FacecamAsset, InteractionFlags, NewFacecam, NewPhoto, NewPhotoDetail, Photo,
    PhotoDetail, PreviewUrls, SimilarPhoto, SimilarUser, StoreError,
};

#[derive(Clone)]
pub struct PostgresPhotoStore {
    pool: PgPool,
}

fn map_query_err(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() || db.is_foreign_key_violation() {
            return StoreError::Conflict(db.to_string());
        }
    }
    StoreError::Query(e.to_string())
}

impl PostgresPhotoStore {
    /// Connect and run migrations.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!("Metadata store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Create a store from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_query_err)?;
        Ok(())
    }

    pub async fn create_photo(
        &self,
        photo: NewPhoto,
        detail: NewPhotoDetail,
    ) -> Result<(Uuid, Uuid), StoreError> {
        if detail.photo_id != photo.id {
            return Err(StoreError::Conflict(
                "detail does not reference the created photo".into(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(map_query_err)?;

        sqlx::query(
            r#"
            INSERT INTO photos
                (id, creator_id, title, collection_url, price, price_str, original_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(photo.id)
        .bind(photo.creator_id)
        .bind(&photo.title)
        .bind(&photo.collection_url)
        .bind(photo.price)
        .bind(&photo.price_str)
        .bind(photo.original_at)
        .execute(&mut *tx)
        .await
        .map_err(map_query_err)?;

        let detail_id = Self::insert_detail(&mut tx, &detail).await?;

        tx.commit().await.map_err(map_query_err)?;
        Ok((photo.id, detail_id))
    }

    async fn insert_detail(
        tx: &mut Transaction<'_, Postgres>,
        detail: &NewPhotoDetail,
    ) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO photo_details
                (id, photo_id, file_name, file_key, size, format, checksum,
                 width, height, url, kind)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(id)
        .bind(detail.photo_id)
        .bind(&detail.file_name)
        .bind(&detail.file_key)
        .bind(detail.size)
        .bind(&detail.format)
        .bind(&detail.checksum)
        .bind(detail.width)
        .bind(detail.height)
        .bind(&detail.url)
        .bind(detail.kind.as_str())
        .execute(&mut **tx)
        .await
        .map_err(map_query_err)?;
        Ok(id)
    }

    pub async fn add_photo_detail(&self, detail: NewPhotoDetail) -> Result<Uuid, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_query_err)?;

        let result = Self::insert_detail(&mut tx, &detail).await;
        let id = match result {
            Ok(id) => id,
            // A foreign-key violation here means the referenced photo
            // does not exist.
            Err(StoreError::Conflict(_)) => {
                return Err(StoreError::NotFound(format!("photo {}", detail.photo_id)));
            }
            Err(e) => return Err(e),
        };

        tx.commit().await.map_err(map_query_err)?;
        Ok(id)
    }

    pub async fn get_photo(&self, id: Uuid) -> Result<Option<Photo>, StoreError> {
        sqlx::query_as::<_, Photo>("SELECT * FROM photos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err)
    }

    pub async fn photo_details(&self, photo_id: Uuid) -> Result<Vec<PhotoDetail>, StoreError> {
        sqlx::query_as::<_, PhotoDetail>(
            "SELECT * FROM photo_details WHERE photo_id = $1 ORDER BY created_at",
        )
        .bind(photo_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_query_err)
    }

    pub async fn apply_photo_recognition(
        &self,
        photo_id: Uuid,
        preview: &PreviewUrls,
        target: &[SimilarUser],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_query_err)?;

        // Serialize concurrent reconciliations for the same photo.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(photo_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_query_err)?;

        let updated = sqlx::query(
            r#"
            UPDATE photos
            SET is_this_you_url = COALESCE($2, is_this_you_url),
                your_moments_url = COALESCE($3, your_moments_url),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(photo_id)
        .bind(&preview.is_this_you_url)
        .bind(&preview.your_moments_url)
        .execute(&mut *tx)
        .await
        .map_err(map_query_err)?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("photo {photo_id}")));
        }

        if target.is_empty() {
            // Deliberate full clear, distinct from "unchanged".
            sqlx::query("DELETE FROM user_similar_photos WHERE photo_id = $1")
                .bind(photo_id)
                .execute(&mut *tx)
                .await
                .map_err(map_query_err)?;
        } else {
            let user_ids: Vec<Uuid> = target.iter().map(|m| m.user_id).collect();
            let row_ids: Vec<Uuid> = target.iter().map(|_| Uuid::new_v4()).collect();
            let levels: Vec<String> =
                target.iter().map(|m| m.similarity.as_str().to_string()).collect();

            // Delete-before-insert: a user who drops out and re-enters
            // between two calls gets a single fresh row.
            sqlx::query(
                "DELETE FROM user_similar_photos WHERE photo_id = $1 AND user_id <> ALL($2)",
            )
            .bind(photo_id)
            .bind(&user_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_query_err)?;

            sqlx::query(
                r#"
                INSERT INTO user_similar_photos (id, photo_id, user_id, similarity)
                SELECT t.id, $1, t.user_id, t.similarity
                FROM UNNEST($2::uuid[], $3::uuid[], $4::text[]) AS t(id, user_id, similarity)
                ON CONFLICT (photo_id, user_id) DO UPDATE
                SET similarity = EXCLUDED.similarity,
                    updated_at = NOW()
                "#,
            )
            .bind(photo_id)
            .bind(&row_ids)
            .bind(&user_ids)
            .bind(&levels)
            .execute(&mut *tx)
            .await
            .map_err(map_query_err)?;
        }

        tx.commit().await.map_err(map_query_err)?;
        Ok(())
    }

    pub async fn similar_users(
        &self,
        photo_id: Uuid,
    ) -> Result<Vec<super::UserSimilarPhoto>, StoreError> {
        sqlx::query_as::<_, super::UserSimilarPhoto>(
            "SELECT * FROM user_similar_photos WHERE photo_id = $1 ORDER BY user_id",
        )
        .bind(photo_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_query_err)
    }

    pub async fn set_interaction_flags(
        &self,
        photo_id: Uuid,
        user_id: Uuid,
        flags: InteractionFlags,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE user_similar_photos
            SET is_wishlist = $3, is_resend = $4, is_cart = $5, is_favorite = $6,
                updated_at = NOW()
            WHERE photo_id = $1 AND user_id = $2
            "#,
        )
        .bind(photo_id)
        .bind(user_id)
        .bind(flags.is_wishlist)
        .bind(flags.is_resend)
        .bind(flags.is_cart)
        .bind(flags.is_favorite)
        .execute(&self.pool)
        .await
        .map_err(map_query_err)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_facecam(&self, facecam: NewFacecam) -> Result<Uuid, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO facecams
                (id, user_id, title, file_name, file_key, size, checksum, url, original_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE
            SET file_name = EXCLUDED.file_name,
                file_key = EXCLUDED.file_key,
                title = EXCLUDED.title,
                size = EXCLUDED.size,
                checksum = EXCLUDED.checksum,
                url = EXCLUDED.url,
                is_processed = FALSE,
                original_at = EXCLUDED.original_at,
                updated_at = NOW()
            "#,
        )
        .bind(facecam.id)
        .bind(facecam.user_id)
        .bind(&facecam.title)
        .bind(&facecam.file_name)
        .bind(&facecam.file_key)
        .bind(facecam.size)
        .bind(&facecam.checksum)
        .bind(&facecam.url)
        .bind(facecam.original_at)
        .execute(&self.pool)
        .await
        .map_err(map_query_err)?;

        Ok(facecam.id)
    }

    pub async fn update_facecam_asset(
        &self,
        user_id: Uuid,
        asset: &FacecamAsset,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE facecams
            SET file_name = $2, file_key = $3, size = $4, checksum = $5, url = $6,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(&asset.file_name)
        .bind(&asset.file_key)
        .bind(asset.size)
        .bind(&asset.checksum)
        .bind(&asset.url)
        .execute(&self.pool)
        .await
        .map_err(map_query_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("facecam for user {user_id}")));
        }
        Ok(())
    }

    pub async fn get_facecam(&self, user_id: Uuid) -> Result<Option<Facecam>, StoreError> {
        sqlx::query_as::<_, Facecam>("SELECT * FROM facecams WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err)
    }

    pub async fn apply_facecam_recognition(
        &self,
        user_id: Uuid,
        target: &[SimilarPhoto],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_query_err)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_query_err)?;

        let updated = sqlx::query(
            "UPDATE facecams SET is_processed = TRUE, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_query_err)?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("facecam for user {user_id}")));
        }

        if target.is_empty() {
            sqlx::query("DELETE FROM user_similar_photos WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(map_query_err)?;
        } else {
            let photo_ids: Vec<Uuid> = target.iter().map(|m| m.photo_id).collect();
            let row_ids: Vec<Uuid> = target.iter().map(|_| Uuid::new_v4()).collect();
            let levels: Vec<String> =
                target.iter().map(|m| m.similarity.as_str().to_string()).collect();

            sqlx::query(
                "DELETE FROM user_similar_photos WHERE user_id = $1 AND photo_id <> ALL($2)",
            )
            .bind(user_id)
            .bind(&photo_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_query_err)?;

            sqlx::query(
                r#"
                INSERT INTO user_similar_photos (id, photo_id, user_id, similarity)
                SELECT t.id, t.photo_id, $1, t.similarity
                FROM UNNEST($2::uuid[], $3::uuid[], $4::text[]) AS t(id, photo_id, similarity)
                ON CONFLICT (photo_id, user_id) DO UPDATE
                SET similarity = EXCLUDED.similarity,
                    updated_at = NOW()
                "#,
            )
            .bind(user_id)
            .bind(&row_ids)
            .bind(&photo_ids)
            .bind(&levels)
            .execute(&mut *tx)
            .await
            .map_err(map_query_err)?;
        }

        tx.commit().await.map_err(map_query_err)?;
        Ok(())
    }
}
