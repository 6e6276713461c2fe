//! SQLite per-product metadata repository

use crate::store::{MetadataStore, StoreResult};
use async_trait::async_trait;
use sqlx::SqlitePool;

/// String-keyed product metadata backed by the shared SQLite pool
#[derive(Clone)]
pub struct MetaRepository {
    pool: SqlitePool,
}

impl MetaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for MetaRepository {
    async fn get_meta(&self, product_id: i64, key: &str) -> StoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM product_meta WHERE product_id = ? AND key = ?",
        )
        .bind(product_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set_meta(&self, product_id: i64, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO product_meta (product_id, key, value) VALUES (?, ?, ?)
             ON CONFLICT(product_id, key) DO UPDATE SET value = excluded.value",
        )
        .bind(product_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_meta(&self, product_id: i64, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM product_meta WHERE product_id = ? AND key = ?")
            .bind(product_id)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
