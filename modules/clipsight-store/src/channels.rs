use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use clipsight_common::{Channel, ChannelHistory, SocialPlatform};

use crate::error::{Result, StoreError};
use crate::PgStore;

#[derive(Debug, FromRow)]
struct ChannelRow {
    id: Uuid,
    handle: String,
    display_name: String,
    platform: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChannelRow {
    fn into_channel(self) -> Result<Channel> {
        let platform = SocialPlatform::from_str(&self.platform).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown channel platform {}", self.platform))
        })?;
        Ok(Channel {
            id: self.id,
            handle: self.handle,
            display_name: self.display_name,
            platform,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    channel_id: Uuid,
    followers_count: i64,
    following_count: i64,
    media_count: i64,
    average_likes: i64,
    average_comments: i64,
    average_video_views: i64,
    average_video_plays: i64,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for ChannelHistory {
    fn from(row: HistoryRow) -> Self {
        ChannelHistory {
            id: row.id,
            channel_id: row.channel_id,
            followers_count: row.followers_count,
            following_count: row.following_count,
            media_count: row.media_count,
            average_likes: row.average_likes,
            average_comments: row.average_comments,
            average_video_views: row.average_video_views,
            average_video_plays: row.average_video_plays,
            created_at: row.created_at,
        }
    }
}

impl PgStore {
    pub async fn find_channel_by_handle(&self, handle: &str) -> Result<Option<Channel>> {
        let row = sqlx::query_as::<_, ChannelRow>("SELECT * FROM channels WHERE handle = $1")
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ChannelRow::into_channel).transpose()
    }

    /// Create or refresh a channel by handle and return its id. Two jobs
    /// racing on a new author both land here; the conflict clause makes the
    /// loser adopt the winner's row.
    pub async fn upsert_channel(&self, channel: &Channel) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO channels (id, handle, display_name, platform)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (handle) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                updated_at = now()
            RETURNING id
            "#,
        )
        .bind(channel.id)
        .bind(&channel.handle)
        .bind(&channel.display_name)
        .bind(channel.platform.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Append one immutable stats snapshot. Never updated or deleted.
    pub async fn append_channel_history(&self, history: &ChannelHistory) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO channel_histories
                (id, channel_id, followers_count, following_count, media_count,
                 average_likes, average_comments, average_video_views, average_video_plays)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(history.id)
        .bind(history.channel_id)
        .bind(history.followers_count)
        .bind(history.following_count)
        .bind(history.media_count)
        .bind(history.average_likes)
        .bind(history.average_comments)
        .bind(history.average_video_views)
        .bind(history.average_video_plays)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The channel's most recent snapshot.
    pub async fn latest_channel_history(&self, channel_id: Uuid) -> Result<Option<ChannelHistory>> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT * FROM channel_histories
            WHERE channel_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ChannelHistory::from))
    }
}
