use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use clipsight_common::{Post, PostStatus};

use crate::error::{Result, StoreError};
use crate::PgStore;

#[derive(Debug, FromRow)]
struct PostRow {
    id: String,
    channel_id: Option<Uuid>,
    link: String,
    image_url: Option<String>,
    video_url: Option<String>,
    author_handle: String,
    author_name: String,
    author_profile_url: String,
    status: String,
    fail_reason: Option<String>,
    like_count: i64,
    comment_count: i64,
    video_view_count: i64,
    video_play_count: i64,
    posted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_post(self) -> Result<Post> {
        let status = PostStatus::from_str(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown post status {}", self.status)))?;
        Ok(Post {
            id: self.id,
            channel_id: self.channel_id,
            link: self.link,
            image_url: self.image_url,
            video_url: self.video_url,
            author_handle: self.author_handle,
            author_name: self.author_name,
            author_profile_url: self.author_profile_url,
            status,
            fail_reason: self.fail_reason,
            like_count: self.like_count,
            comment_count: self.comment_count,
            video_view_count: self.video_view_count,
            video_play_count: self.video_play_count,
            posted_at: self.posted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgStore {
    pub async fn find_post(&self, id: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PostRow::into_post).transpose()
    }

    /// Insert or update a post row. Repeated submissions of the same
    /// content converge here because the id is the derived shortcode.
    pub async fn upsert_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts
                (id, channel_id, link, image_url, video_url,
                 author_handle, author_name, author_profile_url,
                 status, fail_reason,
                 like_count, comment_count, video_view_count, video_play_count,
                 posted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (id) DO UPDATE SET
                channel_id = EXCLUDED.channel_id,
                link = EXCLUDED.link,
                image_url = EXCLUDED.image_url,
                video_url = EXCLUDED.video_url,
                author_handle = EXCLUDED.author_handle,
                author_name = EXCLUDED.author_name,
                author_profile_url = EXCLUDED.author_profile_url,
                status = EXCLUDED.status,
                fail_reason = EXCLUDED.fail_reason,
                like_count = EXCLUDED.like_count,
                comment_count = EXCLUDED.comment_count,
                video_view_count = EXCLUDED.video_view_count,
                video_play_count = EXCLUDED.video_play_count,
                posted_at = EXCLUDED.posted_at,
                updated_at = now()
            "#,
        )
        .bind(&post.id)
        .bind(post.channel_id)
        .bind(&post.link)
        .bind(&post.image_url)
        .bind(&post.video_url)
        .bind(&post.author_handle)
        .bind(&post.author_name)
        .bind(&post.author_profile_url)
        .bind(post.status.as_str())
        .bind(&post.fail_reason)
        .bind(post.like_count)
        .bind(post.comment_count)
        .bind(post.video_view_count)
        .bind(post.video_play_count)
        .bind(post.posted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
