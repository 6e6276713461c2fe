//! SQLite attached-image bookkeeping

use crate::store::{AttachmentStore, StoreResult};
use async_trait::async_trait;
use sqlx::SqlitePool;

/// Featured-image and gallery associations backed by the shared SQLite pool.
///
/// The background fetch worker populates rows via the set/append operations;
/// the import core reads current URLs and clears associations before a
/// re-sync.
#[derive(Clone)]
pub struct AttachmentRepository {
    pool: SqlitePool,
}

impl AttachmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttachmentStore for AttachmentRepository {
    async fn current_image_urls(&self, product_id: i64) -> StoreResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT url FROM product_images WHERE product_id = ?
             ORDER BY is_featured DESC, position ASC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }

    async fn set_featured_image(&self, product_id: i64, url: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM product_images WHERE product_id = ? AND is_featured = 1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "INSERT INTO product_images (product_id, url, position, is_featured)
             VALUES (?, ?, 0, 1)",
        )
        .bind(product_id)
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_gallery_image(&self, product_id: i64, url: &str) -> StoreResult<()> {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 1) FROM product_images
             WHERE product_id = ? AND is_featured = 0",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            "INSERT INTO product_images (product_id, url, position, is_featured)
             VALUES (?, ?, ?, 0)",
        )
        .bind(product_id)
        .bind(url)
        .bind(next)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_featured_image(&self, product_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM product_images WHERE product_id = ? AND is_featured = 1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_gallery(&self, product_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM product_images WHERE product_id = ? AND is_featured = 0")
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
