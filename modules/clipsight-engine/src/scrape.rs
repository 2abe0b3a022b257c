//! Fetches a post's public data plus a sample of the author's recent
//! reels, and maintains the channel's rolling averages.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use clipsight_common::{
    Channel, ChannelHistory, PeerReelStats, Post, PostStatus, ReelSnapshot, SocialPlatform,
    PEER_SAMPLE_SIZE,
};

use crate::traits::{ContentStore, ReelSource};

/// What a scrape run produced. The peer sample is non-fatal: when it
/// fails, `channel_history` is absent and `peer_error` says why, and the
/// caller decides whether analysis still proceeds.
pub struct ScrapeOutcome {
    pub reel: ReelSnapshot,
    pub channel_history: Option<ChannelHistory>,
    pub peer_error: Option<String>,
}

pub struct ScrapeOrchestrator {
    source: Arc<dyn ReelSource>,
    store: Arc<dyn ContentStore>,
}

impl ScrapeOrchestrator {
    pub fn new(source: Arc<dyn ReelSource>, store: Arc<dyn ContentStore>) -> Self {
        Self { source, store }
    }

    /// Scrape the target reel, persist the post's scraped fields
    /// immediately, resolve the author's channel, and append one stats
    /// snapshot from the peer sample. A primary-fetch failure propagates
    /// as-is; retries belong to the job system, not here.
    pub async fn fetch_and_update(&self, post: &mut Post) -> Result<ScrapeOutcome> {
        let reel = self.source.reel(&post.id).await?;

        post.status = PostStatus::Processing;
        post.author_handle = reel.author_handle.clone();
        post.author_name = reel
            .author_name
            .clone()
            .unwrap_or_else(|| reel.author_handle.clone());
        post.author_profile_url = format!("https://instagram.com/{}", reel.author_handle);
        post.image_url = reel.image_url.clone();
        post.video_url = reel.video_url.clone();
        post.like_count = reel.like_count;
        post.comment_count = reel.comment_count;
        post.video_view_count = reel.video_view_count;
        post.video_play_count = reel.video_play_count;
        post.posted_at = reel.posted_at;

        // Persist now so partial progress survives a later failure.
        self.store.upsert_post(post).await?;

        let channel_id = self.resolve_channel(post, &reel).await?;

        match self.append_history(channel_id, &reel).await {
            Ok(history) => Ok(ScrapeOutcome {
                reel,
                channel_history: Some(history),
                peer_error: None,
            }),
            Err(e) => {
                warn!(
                    post_id = %post.id,
                    error = %e,
                    "Peer sample failed; continuing without channel averages"
                );
                Ok(ScrapeOutcome {
                    reel,
                    channel_history: None,
                    peer_error: Some(format!("{e:#}")),
                })
            }
        }
    }

    /// Link the post to its author's channel, creating the channel on
    /// first sight. A lost create race resolves to the winner's row.
    async fn resolve_channel(&self, post: &mut Post, reel: &ReelSnapshot) -> Result<Uuid> {
        if let Some(id) = post.channel_id {
            return Ok(id);
        }

        let now = Utc::now();
        let channel = Channel {
            id: Uuid::new_v4(),
            handle: reel.author_handle.clone(),
            display_name: reel
                .author_name
                .clone()
                .unwrap_or_else(|| reel.author_handle.clone()),
            platform: SocialPlatform::Instagram,
            created_at: now,
            updated_at: now,
        };
        let channel_id = self.store.upsert_channel(&channel).await?;

        post.channel_id = Some(channel_id);
        self.store.upsert_post(post).await?;

        info!(handle = %reel.author_handle, %channel_id, "Linked post to channel");
        Ok(channel_id)
    }

    async fn append_history(&self, channel_id: Uuid, reel: &ReelSnapshot) -> Result<ChannelHistory> {
        let peers = self
            .source
            .recent_reels(&reel.author_handle, PEER_SAMPLE_SIZE)
            .await?;

        let history = build_history(channel_id, reel, &peers);
        self.store.append_channel_history(&history).await?;

        info!(
            %channel_id,
            sample = peers.len(),
            average_likes = history.average_likes,
            "Appended channel history snapshot"
        );
        Ok(history)
    }
}

/// Arithmetic means over the peer sample; an empty sample averages to 0.
fn build_history(channel_id: Uuid, reel: &ReelSnapshot, peers: &[PeerReelStats]) -> ChannelHistory {
    let n = peers.len() as i64;
    let mean = |total: i64| if n == 0 { 0 } else { total / n };

    ChannelHistory {
        id: Uuid::new_v4(),
        channel_id,
        followers_count: reel.followers_count,
        following_count: reel.following_count,
        media_count: reel.media_count,
        average_likes: mean(peers.iter().map(|p| p.like_count).sum()),
        average_comments: mean(peers.iter().map(|p| p.comment_count).sum()),
        average_video_views: mean(peers.iter().map(|p| p.video_view_count).sum()),
        average_video_plays: mean(peers.iter().map(|p| p.video_play_count).sum()),
        created_at: Utc::now(),
    }
}
