//! SQLite product catalog and category taxonomy repository

use crate::store::{
    CatalogStore, CategoryNode, NewProduct, ProductUpdate, StoreError, StoreResult,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

/// Catalog access backed by the shared SQLite pool
#[derive(Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn find_by_sku(&self, sku: &str) -> StoreResult<Option<i64>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM products WHERE sku = ? LIMIT 1")
                .bind(sku)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    async fn find_by_exact_title(&self, title: &str) -> StoreResult<Option<i64>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM products WHERE title = ? LIMIT 1")
                .bind(title)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    async fn create_product(&self, fields: &NewProduct) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO products
                (title, description, price, sku, status, is_virtual,
                 manage_stock, stock_quantity, in_stock, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(&fields.sku)
        .bind(&fields.status)
        .bind(fields.is_virtual)
        .bind(fields.manage_stock)
        .bind(fields.stock_quantity)
        .bind(fields.in_stock)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_product(&self, id: i64, fields: &ProductUpdate) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE products SET
                description = COALESCE(?, description),
                price = COALESCE(?, price),
                status = COALESCE(?, status),
                stock_quantity = COALESCE(?, stock_quantity),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.description)
        .bind(fields.price)
        .bind(&fields.status)
        .bind(fields.stock_quantity)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_categories(&self, id: i64, categories: &[i64]) -> StoreResult<()> {
        sqlx::query("DELETE FROM product_categories WHERE product_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        for category_id in categories {
            sqlx::query(
                "INSERT OR IGNORE INTO product_categories (product_id, category_id) VALUES (?, ?)",
            )
            .bind(id)
            .bind(category_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn set_tags(&self, id: i64, tags: &[String]) -> StoreResult<()> {
        sqlx::query("DELETE FROM product_tags WHERE product_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        for (position, tag) in tags.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO product_tags (product_id, tag, position) VALUES (?, ?, ?)",
            )
            .bind(id)
            .bind(tag)
            .bind(position as i64)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn categories_for_product(&self, id: i64) -> StoreResult<Vec<CategoryNode>> {
        let rows: Vec<(i64, String, i64, String)> = sqlx::query_as(
            r#"
            SELECT c.id, c.name, c.parent_id, c.slug
            FROM categories c
            JOIN product_categories pc ON pc.category_id = c.id
            WHERE pc.product_id = ?
            ORDER BY c.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(node_from_row).collect())
    }

    async fn category_terms(&self) -> StoreResult<Vec<CategoryNode>> {
        let rows: Vec<(i64, String, i64, String)> =
            sqlx::query_as("SELECT id, name, parent_id, slug FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(node_from_row).collect())
    }

    async fn find_category(&self, name: &str, parent: i64) -> StoreResult<Option<CategoryNode>> {
        let row: Option<(i64, String, i64, String)> = sqlx::query_as(
            "SELECT id, name, parent_id, slug FROM categories WHERE name = ? AND parent_id = ?",
        )
        .bind(name)
        .bind(parent)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(node_from_row))
    }

    async fn create_category(
        &self,
        name: &str,
        parent: i64,
        slug: &str,
    ) -> StoreResult<CategoryNode> {
        let result = sqlx::query(
            "INSERT INTO categories (name, parent_id, slug) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(parent)
        .bind(slug)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(CategoryNode {
                id: done.last_insert_rowid(),
                name: name.to_string(),
                parent,
                slug: slug.to_string(),
            }),
            Err(err) if is_unique_violation(&err) => {
                // Lost a creation race; surface the pre-existing node
                let existing = self.find_category(name, parent).await?.ok_or_else(|| {
                    StoreError::Other(format!(
                        "category '{}' reported duplicate but was not found",
                        name
                    ))
                })?;
                Err(StoreError::DuplicateCategory { existing })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn count_categories(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn node_from_row((id, name, parent, slug): (i64, String, i64, String)) -> CategoryNode {
    CategoryNode {
        id,
        name,
        parent,
        slug,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE constraint failed"))
}
