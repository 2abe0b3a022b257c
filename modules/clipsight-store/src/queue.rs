use sqlx::FromRow;

use clipsight_common::{JobKind, QueueJob};

use crate::error::{Result, StoreError};
use crate::PgStore;

#[derive(Debug, FromRow)]
struct JobRow {
    kind: String,
    payload: serde_json::Value,
}

impl JobRow {
    fn into_job(self) -> Result<(JobKind, QueueJob)> {
        let kind = JobKind::from_str(&self.kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown job kind {}", self.kind)))?;
        let job: QueueJob = serde_json::from_value(self.payload)
            .map_err(|e| StoreError::Corrupt(format!("queue payload: {e}")))?;
        Ok((kind, job))
    }
}

impl PgStore {
    /// Append a job to its class queue. Insert order is pop order.
    pub async fn enqueue_job(&self, kind: JobKind, job: &QueueJob) -> Result<()> {
        let payload = serde_json::to_value(job)
            .map_err(|e| StoreError::Corrupt(format!("queue payload: {e}")))?;
        sqlx::query("INSERT INTO queue_jobs (kind, payload) VALUES ($1, $2)")
            .bind(kind.as_str())
            .bind(payload)
            .execute(&self.pool)
            .await?;
        tracing::debug!(kind = %kind, request_id = %job.request_id, "Enqueued job");
        Ok(())
    }

    /// Pop the oldest job, draining fresh work before renew work. Returns
    /// None when both queues are empty. `FOR UPDATE SKIP LOCKED` keeps the
    /// pop safe if additional consumers are ever added.
    pub async fn pop_job(&self) -> Result<Option<(JobKind, QueueJob)>> {
        for kind in [JobKind::Fresh, JobKind::Renew] {
            let row = sqlx::query_as::<_, JobRow>(
                r#"
                DELETE FROM queue_jobs
                WHERE id = (
                    SELECT id FROM queue_jobs
                    WHERE kind = $1
                    ORDER BY id
                    LIMIT 1
                    FOR UPDATE SKIP LOCKED
                )
                RETURNING kind, payload
                "#,
            )
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = row {
                return row.into_job().map(Some);
            }
        }
        Ok(None)
    }
}
