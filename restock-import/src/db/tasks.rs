//! SQLite background task queue

use crate::store::{StoreResult, TaskQueue};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::SqlitePool;
use std::time::Duration;

/// One queued background task
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub id: i64,
    pub name: String,
    pub payload: serde_json::Value,
    pub run_after: DateTime<Utc>,
}

/// Task queue backed by the shared SQLite pool.
///
/// The import core only enqueues; a worker outside this crate drains rows
/// whose `run_after` has passed.
#[derive(Clone)]
pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All queued tasks in enqueue order (worker/diagnostic use)
    pub async fn pending(&self) -> StoreResult<Vec<QueuedTask>> {
        let rows: Vec<(i64, String, String, String)> =
            sqlx::query_as("SELECT id, name, payload, run_after FROM task_queue ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, payload, run_after)| QueuedTask {
                id,
                name,
                payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
                run_after: run_after
                    .parse::<DateTime<Utc>>()
                    .unwrap_or_else(|_| Utc::now()),
            })
            .collect())
    }
}

#[async_trait]
impl TaskQueue for TaskRepository {
    async fn enqueue(
        &self,
        name: &str,
        payload: serde_json::Value,
        run_after: Duration,
    ) -> StoreResult<()> {
        let now = Utc::now();
        let due = now + ChronoDuration::from_std(run_after).unwrap_or(ChronoDuration::zero());

        sqlx::query(
            "INSERT INTO task_queue (name, payload, run_after, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(payload.to_string())
        .bind(due.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use serde_json::json;

    #[tokio::test]
    async fn enqueue_preserves_order_and_delay() {
        let repo = TaskRepository::new(test_pool().await);
        let before = Utc::now();

        repo.enqueue("fetch_image", json!({"url": "a"}), Duration::ZERO)
            .await
            .unwrap();
        repo.enqueue("fetch_image", json!({"url": "b"}), Duration::from_secs(5))
            .await
            .unwrap();

        let tasks = repo.pending().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].payload["url"], "a");
        assert_eq!(tasks[1].payload["url"], "b");

        // Second task is due at least 5 seconds after the first
        let gap = tasks[1].run_after - tasks[0].run_after;
        assert!(gap.num_seconds() >= 4, "gap was {:?}", gap);
        assert!(tasks[0].run_after >= before - ChronoDuration::seconds(1));
    }
}
