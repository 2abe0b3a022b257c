use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use clipsight_common::{AnalyzeRequest, RequestStatus};

use crate::error::{Result, StoreError};
use crate::PgStore;

#[derive(Debug, FromRow)]
struct RequestRow {
    id: Uuid,
    user_id: Option<Uuid>,
    user_ip: String,
    link: String,
    post_id: Option<String>,
    status: String,
    fail_reason: Option<String>,
    llm_request: Option<String>,
    llm_response: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_request(self) -> Result<AnalyzeRequest> {
        let status = RequestStatus::from_str(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown request status {}", self.status))
        })?;
        Ok(AnalyzeRequest {
            id: self.id,
            user_id: self.user_id,
            user_ip: self.user_ip,
            link: self.link,
            post_id: self.post_id,
            status,
            fail_reason: self.fail_reason,
            llm_request: self.llm_request,
            llm_response: self.llm_response,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgStore {
    pub async fn find_request(&self, id: Uuid) -> Result<Option<AnalyzeRequest>> {
        let row = sqlx::query_as::<_, RequestRow>("SELECT * FROM analyze_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(RequestRow::into_request).transpose()
    }

    /// Requests for a post, most recently touched first.
    pub async fn list_requests_for_post(&self, post_id: &str) -> Result<Vec<AnalyzeRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(
            "SELECT * FROM analyze_requests WHERE post_id = $1 ORDER BY updated_at DESC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RequestRow::into_request).collect()
    }

    /// Requests for a source link, most recently touched first. Covers
    /// submissions made before the post row existed.
    pub async fn list_requests_for_link(&self, link: &str) -> Result<Vec<AnalyzeRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(
            "SELECT * FROM analyze_requests WHERE link = $1 ORDER BY updated_at DESC",
        )
        .bind(link)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RequestRow::into_request).collect()
    }

    pub async fn upsert_request(&self, request: &AnalyzeRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO analyze_requests
                (id, user_id, user_ip, link, post_id, status, fail_reason,
                 llm_request, llm_response)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                post_id = EXCLUDED.post_id,
                status = EXCLUDED.status,
                fail_reason = EXCLUDED.fail_reason,
                llm_request = EXCLUDED.llm_request,
                llm_response = EXCLUDED.llm_response,
                updated_at = now()
            "#,
        )
        .bind(request.id)
        .bind(request.user_id)
        .bind(&request.user_ip)
        .bind(&request.link)
        .bind(&request.post_id)
        .bind(request.status.as_str())
        .bind(&request.fail_reason)
        .bind(&request.llm_request)
        .bind(&request.llm_response)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Count submissions from an IP within the UTC calendar day containing
    /// `at`. Feeds the anonymous rate limit.
    pub async fn count_requests_by_ip_on_day(&self, ip: &str, at: DateTime<Utc>) -> Result<i64> {
        let start = at
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc();
        let end = start + Duration::hours(24);

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM analyze_requests
            WHERE user_ip = $1 AND created_at >= $2 AND created_at < $3
            "#,
        )
        .bind(ip)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
