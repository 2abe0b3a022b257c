//! Trait abstractions for the pipeline's collaborators.
//!
//! ContentStore wraps Postgres persistence, WorkQueue the durable job
//! queue, ReelSource the scrape provider, VideoAnalyst the LLM provider.
//! Each has an in-memory mock in `testing`, so the whole pipeline runs
//! under `cargo test` with no network and no database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use clipsight_common::{
    AnalyzeRequest, Channel, ChannelHistory, JobKind, PeerReelStats, Post, PostAnalysis,
    PostContent, QueueJob, ReelSnapshot,
};
use gemini_client::{AnalysisExchange, VideoAnalysisRequest};

// ---------------------------------------------------------------------------
// ContentStore — wraps PgStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ContentStore: Send + Sync {
    // --- Posts ---
    async fn find_post(&self, id: &str) -> Result<Option<Post>>;
    async fn upsert_post(&self, post: &Post) -> Result<()>;

    // --- Analyze requests ---
    async fn find_request(&self, id: Uuid) -> Result<Option<AnalyzeRequest>>;
    async fn list_requests_for_post(&self, post_id: &str) -> Result<Vec<AnalyzeRequest>>;
    async fn list_requests_for_link(&self, link: &str) -> Result<Vec<AnalyzeRequest>>;
    async fn upsert_request(&self, request: &AnalyzeRequest) -> Result<()>;

    /// Submissions from an IP within the UTC calendar day containing `at`.
    async fn count_requests_by_ip_on_day(&self, ip: &str, at: DateTime<Utc>) -> Result<i64>;

    // --- Channels ---
    async fn find_channel_by_handle(&self, handle: &str) -> Result<Option<Channel>>;

    /// Create-or-reuse by handle; returns the surviving row's id.
    async fn upsert_channel(&self, channel: &Channel) -> Result<Uuid>;
    async fn append_channel_history(&self, history: &ChannelHistory) -> Result<()>;
    async fn latest_channel_history(&self, channel_id: Uuid) -> Result<Option<ChannelHistory>>;

    // --- Normalized content + analysis ---

    /// Replace all content rows for a post with this run's output,
    /// atomically.
    async fn replace_post_contents(&self, post_id: &str, contents: &[PostContent]) -> Result<()>;
    async fn list_post_contents(&self, post_id: &str) -> Result<Vec<PostContent>>;
    async fn upsert_post_analysis(&self, analysis: &PostAnalysis) -> Result<()>;
    async fn find_post_analysis(&self, post_id: &str) -> Result<Option<PostAnalysis>>;
}

#[async_trait]
impl ContentStore for clipsight_store::PgStore {
    async fn find_post(&self, id: &str) -> Result<Option<Post>> {
        Ok(self.find_post(id).await?)
    }

    async fn upsert_post(&self, post: &Post) -> Result<()> {
        Ok(self.upsert_post(post).await?)
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<AnalyzeRequest>> {
        Ok(self.find_request(id).await?)
    }

    async fn list_requests_for_post(&self, post_id: &str) -> Result<Vec<AnalyzeRequest>> {
        Ok(self.list_requests_for_post(post_id).await?)
    }

    async fn list_requests_for_link(&self, link: &str) -> Result<Vec<AnalyzeRequest>> {
        Ok(self.list_requests_for_link(link).await?)
    }

    async fn upsert_request(&self, request: &AnalyzeRequest) -> Result<()> {
        Ok(self.upsert_request(request).await?)
    }

    async fn count_requests_by_ip_on_day(&self, ip: &str, at: DateTime<Utc>) -> Result<i64> {
        Ok(self.count_requests_by_ip_on_day(ip, at).await?)
    }

    async fn find_channel_by_handle(&self, handle: &str) -> Result<Option<Channel>> {
        Ok(self.find_channel_by_handle(handle).await?)
    }

    async fn upsert_channel(&self, channel: &Channel) -> Result<Uuid> {
        Ok(self.upsert_channel(channel).await?)
    }

    async fn append_channel_history(&self, history: &ChannelHistory) -> Result<()> {
        Ok(self.append_channel_history(history).await?)
    }

    async fn latest_channel_history(&self, channel_id: Uuid) -> Result<Option<ChannelHistory>> {
        Ok(self.latest_channel_history(channel_id).await?)
    }

    async fn replace_post_contents(&self, post_id: &str, contents: &[PostContent]) -> Result<()> {
        Ok(self.replace_post_contents(post_id, contents).await?)
    }

    async fn list_post_contents(&self, post_id: &str) -> Result<Vec<PostContent>> {
        Ok(self.list_post_contents(post_id).await?)
    }

    async fn upsert_post_analysis(&self, analysis: &PostAnalysis) -> Result<()> {
        Ok(self.upsert_post_analysis(analysis).await?)
    }

    async fn find_post_analysis(&self, post_id: &str) -> Result<Option<PostAnalysis>> {
        Ok(self.find_post_analysis(post_id).await?)
    }
}

// ---------------------------------------------------------------------------
// WorkQueue — wraps the Postgres job queue
// ---------------------------------------------------------------------------

#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, kind: JobKind, job: &QueueJob) -> Result<()>;

    /// Pop the oldest job, fresh before renew. None when idle.
    async fn pop(&self) -> Result<Option<(JobKind, QueueJob)>>;
}

#[async_trait]
impl WorkQueue for clipsight_store::PgStore {
    async fn enqueue(&self, kind: JobKind, job: &QueueJob) -> Result<()> {
        Ok(self.enqueue_job(kind, job).await?)
    }

    async fn pop(&self) -> Result<Option<(JobKind, QueueJob)>> {
        Ok(self.pop_job().await?)
    }
}

// ---------------------------------------------------------------------------
// ReelSource — wraps the scrape provider
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ReelSource: Send + Sync {
    /// A single reel's public data by shortcode.
    async fn reel(&self, shortcode: &str) -> Result<ReelSnapshot>;

    /// Engagement counters for a bounded sample of the author's recent
    /// reels.
    async fn recent_reels(&self, handle: &str, limit: u32) -> Result<Vec<PeerReelStats>>;
}

#[async_trait]
impl ReelSource for rocksolid_client::RockSolidClient {
    async fn reel(&self, shortcode: &str) -> Result<ReelSnapshot> {
        let raw = self.get_reel(shortcode).await?;

        let owner = raw.owner.clone().unwrap_or_default();
        let comments = raw
            .comment_texts()
            .into_iter()
            .map(str::to_string)
            .collect();
        let coauthors = raw
            .coauthor_producers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|c| c.username.clone())
            .collect();

        Ok(ReelSnapshot {
            shortcode: raw.shortcode.clone().unwrap_or_else(|| shortcode.to_string()),
            caption: raw.caption().map(str::to_string),
            author_handle: owner.username.clone().unwrap_or_default(),
            author_name: owner.full_name,
            image_url: raw.display_url.clone(),
            video_url: raw.video_url.clone(),
            like_count: raw.like_count(),
            comment_count: raw.comment_count(),
            video_view_count: raw.video_view_count.unwrap_or(0),
            video_play_count: raw.video_play_count.unwrap_or(0),
            followers_count: owner.followers.map(|e| e.count).unwrap_or(0),
            following_count: owner.following.map(|e| e.count).unwrap_or(0),
            media_count: owner.media.map(|e| e.count).unwrap_or(0),
            posted_at: raw.posted_at(),
            coauthors,
            comments,
        })
    }

    async fn recent_reels(&self, handle: &str, limit: u32) -> Result<Vec<PeerReelStats>> {
        let page = self.get_user_reels(handle, limit).await?;
        Ok(page
            .reels
            .into_iter()
            .map(|edge| PeerReelStats {
                like_count: edge.node.media.like_count.unwrap_or(0),
                comment_count: edge.node.media.comment_count.unwrap_or(0),
                video_view_count: edge.node.media.view_count.unwrap_or(0),
                video_play_count: edge.node.media.play_count.unwrap_or(0),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// VideoAnalyst — wraps the LLM provider
// ---------------------------------------------------------------------------

#[async_trait]
pub trait VideoAnalyst: Send + Sync {
    /// One atomic analysis call. Errors may carry the raw exchange for
    /// audit; see `gemini_client::GeminiError`.
    async fn analyze(&self, request: &VideoAnalysisRequest) -> Result<AnalysisExchange>;
}

#[async_trait]
impl VideoAnalyst for gemini_client::Gemini {
    async fn analyze(&self, request: &VideoAnalysisRequest) -> Result<AnalysisExchange> {
        Ok(self.analyze_video(request).await?)
    }
}
