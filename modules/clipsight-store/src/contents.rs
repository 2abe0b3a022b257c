use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use clipsight_common::{ContentKind, ContentMetadata, PostContent};

use crate::error::{Result, StoreError};
use crate::PgStore;

#[derive(Debug, FromRow)]
struct ContentRow {
    id: Uuid,
    post_id: String,
    kind: String,
    language: Option<String>,
    text: String,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl ContentRow {
    fn into_content(self) -> Result<PostContent> {
        let kind = ContentKind::from_str(&self.kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown content kind {}", self.kind)))?;
        let metadata = self
            .metadata
            .map(serde_json::from_value::<ContentMetadata>)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("content metadata: {e}")))?;
        Ok(PostContent {
            id: self.id,
            post_id: self.post_id,
            kind,
            language: self.language,
            text: self.text,
            metadata,
            created_at: self.created_at,
        })
    }
}

impl PgStore {
    /// Replace all content rows for a post with the new run's output, in
    /// one transaction. A failed batch leaves the previous rows in place.
    pub async fn replace_post_contents(
        &self,
        post_id: &str,
        contents: &[PostContent],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM post_contents WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        for content in contents {
            let metadata = content
                .metadata
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| StoreError::Corrupt(format!("content metadata: {e}")))?;

            sqlx::query(
                r#"
                INSERT INTO post_contents (id, post_id, kind, language, text, metadata)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(content.id)
            .bind(&content.post_id)
            .bind(content.kind.as_str())
            .bind(&content.language)
            .bind(&content.text)
            .bind(metadata)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_post_contents(&self, post_id: &str) -> Result<Vec<PostContent>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            "SELECT * FROM post_contents WHERE post_id = $1 ORDER BY created_at ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ContentRow::into_content).collect()
    }
}
