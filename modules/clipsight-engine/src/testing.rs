//! Test mocks for the pipeline, one per trait boundary:
//! MockStore (ContentStore), MockQueue (WorkQueue), MockReelSource
//! (ReelSource), MockAnalyst (VideoAnalyst), FixedDetector
//! (LanguageDetect). Plus helpers for building test entities.
//!
//! All are HashMap/Mutex-based: no network, no database, `cargo test`
//! in seconds.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use clipsight_common::{
    AnalyzeRequest, Channel, ChannelHistory, JobKind, PeerReelStats, Post, PostAnalysis,
    PostContent, QueueJob, ReelSnapshot, RequestStatus,
};
use gemini_client::{
    AnalysisExchange, AnalysisResponse, GeminiError, MetricVerdict, VideoAnalysisRequest,
};

use crate::language::LanguageDetect;
use crate::traits::{ContentStore, ReelSource, VideoAnalyst, WorkQueue};

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockStoreInner {
    posts: HashMap<String, Post>,
    requests: HashMap<Uuid, AnalyzeRequest>,
    channels: HashMap<String, Channel>,
    histories: Vec<ChannelHistory>,
    contents: HashMap<String, Vec<PostContent>>,
    analyses: HashMap<String, PostAnalysis>,
    fail_content_writes: bool,
}

/// Stateful in-memory store. Upserts stamp `updated_at` like the real
/// store's SQL does.
pub struct MockStore {
    inner: Mutex<MockStoreInner>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockStoreInner::default()),
        }
    }

    /// Make `replace_post_contents` fail, for all-or-nothing tests.
    pub fn failing_content_writes(self) -> Self {
        self.inner.lock().unwrap().fail_content_writes = true;
        self
    }

    /// Insert a post verbatim, preserving its timestamps.
    pub fn insert_post(&self, post: Post) {
        self.inner.lock().unwrap().posts.insert(post.id.clone(), post);
    }

    /// Insert a request verbatim, preserving its timestamps.
    pub fn insert_request(&self, request: AnalyzeRequest) {
        self.inner
            .lock()
            .unwrap()
            .requests
            .insert(request.id, request);
    }

    pub fn insert_analysis(&self, analysis: PostAnalysis) {
        self.inner
            .lock()
            .unwrap()
            .analyses
            .insert(analysis.post_id.clone(), analysis);
    }

    pub fn insert_contents(&self, post_id: &str, contents: Vec<PostContent>) {
        self.inner
            .lock()
            .unwrap()
            .contents
            .insert(post_id.to_string(), contents);
    }

    // --- Assertion helpers ---

    pub fn post(&self, id: &str) -> Option<Post> {
        self.inner.lock().unwrap().posts.get(id).cloned()
    }

    pub fn request(&self, id: Uuid) -> Option<AnalyzeRequest> {
        self.inner.lock().unwrap().requests.get(&id).cloned()
    }

    pub fn requests_for_link(&self, link: &str) -> Vec<AnalyzeRequest> {
        let inner = self.inner.lock().unwrap();
        inner
            .requests
            .values()
            .filter(|r| r.link == link)
            .cloned()
            .collect()
    }

    pub fn channel_count(&self) -> usize {
        self.inner.lock().unwrap().channels.len()
    }

    pub fn history_count(&self, channel_id: Uuid) -> usize {
        self.inner
            .lock()
            .unwrap()
            .histories
            .iter()
            .filter(|h| h.channel_id == channel_id)
            .count()
    }

    pub fn contents_for(&self, post_id: &str) -> Vec<PostContent> {
        self.inner
            .lock()
            .unwrap()
            .contents
            .get(post_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn analysis_for(&self, post_id: &str) -> Option<PostAnalysis> {
        self.inner.lock().unwrap().analyses.get(post_id).cloned()
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MockStore {
    async fn find_post(&self, id: &str) -> Result<Option<Post>> {
        Ok(self.inner.lock().unwrap().posts.get(id).cloned())
    }

    async fn upsert_post(&self, post: &Post) -> Result<()> {
        let mut stored = post.clone();
        stored.updated_at = Utc::now();
        self.inner
            .lock()
            .unwrap()
            .posts
            .insert(stored.id.clone(), stored);
        Ok(())
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<AnalyzeRequest>> {
        Ok(self.inner.lock().unwrap().requests.get(&id).cloned())
    }

    async fn list_requests_for_post(&self, post_id: &str) -> Result<Vec<AnalyzeRequest>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<_> = inner
            .requests
            .values()
            .filter(|r| r.post_id.as_deref() == Some(post_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    async fn list_requests_for_link(&self, link: &str) -> Result<Vec<AnalyzeRequest>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<_> = inner
            .requests
            .values()
            .filter(|r| r.link == link)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    async fn upsert_request(&self, request: &AnalyzeRequest) -> Result<()> {
        let mut stored = request.clone();
        stored.updated_at = Utc::now();
        self.inner.lock().unwrap().requests.insert(stored.id, stored);
        Ok(())
    }

    async fn count_requests_by_ip_on_day(&self, ip: &str, at: DateTime<Utc>) -> Result<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .requests
            .values()
            .filter(|r| r.user_ip == ip && r.created_at.date_naive() == at.date_naive())
            .count() as i64)
    }

    async fn find_channel_by_handle(&self, handle: &str) -> Result<Option<Channel>> {
        Ok(self.inner.lock().unwrap().channels.get(handle).cloned())
    }

    async fn upsert_channel(&self, channel: &Channel) -> Result<Uuid> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.channels.get(&channel.handle) {
            return Ok(existing.id);
        }
        inner
            .channels
            .insert(channel.handle.clone(), channel.clone());
        Ok(channel.id)
    }

    async fn append_channel_history(&self, history: &ChannelHistory) -> Result<()> {
        self.inner.lock().unwrap().histories.push(history.clone());
        Ok(())
    }

    async fn latest_channel_history(&self, channel_id: Uuid) -> Result<Option<ChannelHistory>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .histories
            .iter()
            .filter(|h| h.channel_id == channel_id)
            .max_by_key(|h| h.created_at)
            .cloned())
    }

    async fn replace_post_contents(&self, post_id: &str, contents: &[PostContent]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_content_writes {
            bail!("MockStore: content write forced failure");
        }
        inner
            .contents
            .insert(post_id.to_string(), contents.to_vec());
        Ok(())
    }

    async fn list_post_contents(&self, post_id: &str) -> Result<Vec<PostContent>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .contents
            .get(post_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_post_analysis(&self, analysis: &PostAnalysis) -> Result<()> {
        let mut stored = analysis.clone();
        stored.updated_at = Utc::now();
        self.inner
            .lock()
            .unwrap()
            .analyses
            .insert(stored.post_id.clone(), stored);
        Ok(())
    }

    async fn find_post_analysis(&self, post_id: &str) -> Result<Option<PostAnalysis>> {
        Ok(self.inner.lock().unwrap().analyses.get(post_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// MockQueue
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockQueueInner {
    pending: VecDeque<(JobKind, QueueJob)>,
    enqueued: Vec<(JobKind, QueueJob)>,
    fail_enqueue: bool,
}

/// In-memory FIFO queue. `jobs()` returns everything ever enqueued, which
/// is what submission tests assert on; `pop` drains fresh before renew
/// like the real queue.
pub struct MockQueue {
    inner: Mutex<MockQueueInner>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockQueueInner::default()),
        }
    }

    /// Make every enqueue fail.
    pub fn failing(self) -> Self {
        self.inner.lock().unwrap().fail_enqueue = true;
        self
    }

    pub fn jobs(&self) -> Vec<(JobKind, QueueJob)> {
        self.inner.lock().unwrap().enqueued.clone()
    }
}

impl Default for MockQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkQueue for MockQueue {
    async fn enqueue(&self, kind: JobKind, job: &QueueJob) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_enqueue {
            bail!("MockQueue: enqueue forced failure");
        }
        inner.pending.push_back((kind, job.clone()));
        inner.enqueued.push((kind, job.clone()));
        Ok(())
    }

    async fn pop(&self) -> Result<Option<(JobKind, QueueJob)>> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(idx) = inner
            .pending
            .iter()
            .position(|(kind, _)| *kind == JobKind::Fresh)
        {
            return Ok(inner.pending.remove(idx));
        }
        Ok(inner.pending.pop_front())
    }
}

// ---------------------------------------------------------------------------
// MockReelSource
// ---------------------------------------------------------------------------

/// HashMap-based scrape provider. Returns `Err` for unregistered lookups.
pub struct MockReelSource {
    reels: HashMap<String, ReelSnapshot>,
    recent: HashMap<String, Vec<PeerReelStats>>,
}

impl MockReelSource {
    pub fn new() -> Self {
        Self {
            reels: HashMap::new(),
            recent: HashMap::new(),
        }
    }

    pub fn on_reel(mut self, shortcode: &str, reel: ReelSnapshot) -> Self {
        self.reels.insert(shortcode.to_string(), reel);
        self
    }

    pub fn on_recent(mut self, handle: &str, peers: Vec<PeerReelStats>) -> Self {
        self.recent.insert(handle.to_string(), peers);
        self
    }
}

impl Default for MockReelSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReelSource for MockReelSource {
    async fn reel(&self, shortcode: &str) -> Result<ReelSnapshot> {
        self.reels
            .get(shortcode)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockReelSource: no reel registered for {shortcode}"))
    }

    async fn recent_reels(&self, handle: &str, _limit: u32) -> Result<Vec<PeerReelStats>> {
        self.recent
            .get(handle)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockReelSource: no recent reels for {handle}"))
    }
}

// ---------------------------------------------------------------------------
// MockAnalyst
// ---------------------------------------------------------------------------

type ErrorFactory = Box<dyn Fn() -> GeminiError + Send + Sync>;

/// Configurable LLM analyst. Records the last request so tests can assert
/// on the built context.
pub struct MockAnalyst {
    response: Option<AnalysisResponse>,
    error: Option<ErrorFactory>,
    seen: Mutex<Vec<VideoAnalysisRequest>>,
}

impl MockAnalyst {
    pub fn new() -> Self {
        Self {
            response: None,
            error: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: AnalysisResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_error<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> GeminiError + Send + Sync + 'static,
    {
        self.error = Some(Box::new(factory));
        self
    }

    pub fn last_request(&self) -> Option<VideoAnalysisRequest> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Default for MockAnalyst {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoAnalyst for MockAnalyst {
    async fn analyze(&self, request: &VideoAnalysisRequest) -> Result<AnalysisExchange> {
        self.seen.lock().unwrap().push(request.clone());

        if let Some(ref factory) = self.error {
            return Err(factory().into());
        }
        match &self.response {
            Some(analysis) => Ok(AnalysisExchange {
                raw_request: r#"{"mock":"request"}"#.to_string(),
                raw_response: r#"{"mock":"response"}"#.to_string(),
                analysis: analysis.clone(),
            }),
            None => bail!("MockAnalyst: no response configured"),
        }
    }
}

// ---------------------------------------------------------------------------
// FixedDetector
// ---------------------------------------------------------------------------

/// Deterministic language detector: registered texts get exact codes,
/// everything else gets the default (None unless set).
pub struct FixedDetector {
    codes: HashMap<String, String>,
    default: Option<String>,
}

impl FixedDetector {
    pub fn new() -> Self {
        Self {
            codes: HashMap::new(),
            default: None,
        }
    }

    pub fn on_text(mut self, text: &str, code: &str) -> Self {
        self.codes.insert(text.to_string(), code.to_string());
        self
    }

    pub fn with_default(mut self, code: &str) -> Self {
        self.default = Some(code.to_string());
        self
    }
}

impl Default for FixedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetect for FixedDetector {
    fn detect(&self, text: &str) -> Option<String> {
        self.codes.get(text).cloned().or_else(|| self.default.clone())
    }
}

// ---------------------------------------------------------------------------
// Test entity helpers
// ---------------------------------------------------------------------------

/// A pending post row as the ingest gate would create it.
pub fn test_post(shortcode: &str) -> Post {
    let now = Utc::now();
    Post {
        id: shortcode.to_string(),
        channel_id: None,
        link: format!("https://www.instagram.com/reel/{shortcode}"),
        image_url: None,
        video_url: None,
        author_handle: String::new(),
        author_name: String::new(),
        author_profile_url: String::new(),
        status: RequestStatus::Pending,
        fail_reason: None,
        like_count: 0,
        comment_count: 0,
        video_view_count: 0,
        video_play_count: 0,
        posted_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// A pending anonymous tracking record.
pub fn test_request(link: &str, ip: &str) -> AnalyzeRequest {
    let now = Utc::now();
    AnalyzeRequest {
        id: Uuid::new_v4(),
        user_id: None,
        user_ip: ip.to_string(),
        link: link.to_string(),
        post_id: None,
        status: RequestStatus::Pending,
        fail_reason: None,
        llm_request: None,
        llm_response: None,
        created_at: now,
        updated_at: now,
    }
}

/// A fully-populated scraped reel.
pub fn test_reel(shortcode: &str, handle: &str) -> ReelSnapshot {
    ReelSnapshot {
        shortcode: shortcode.to_string(),
        caption: Some("three tricks for faster edits".to_string()),
        author_handle: handle.to_string(),
        author_name: Some("Edit Lab".to_string()),
        image_url: Some("https://cdn.example/thumb.jpg".to_string()),
        video_url: Some("https://cdn.example/clip.mp4".to_string()),
        like_count: 4200,
        comment_count: 310,
        video_view_count: 51_000,
        video_play_count: 73_000,
        followers_count: 120_000,
        following_count: 90,
        media_count: 412,
        posted_at: Some(Utc::now() - Duration::days(2)),
        coauthors: vec!["cutroom".to_string()],
        comments: vec!["this saved my week".to_string(), "part 2 please".to_string()],
    }
}

/// A channel history snapshot with a usable baseline.
pub fn test_history(followers: i64) -> ChannelHistory {
    ChannelHistory {
        id: Uuid::new_v4(),
        channel_id: Uuid::new_v4(),
        followers_count: followers,
        following_count: 90,
        media_count: 412,
        average_likes: 3000,
        average_comments: 150,
        average_video_views: 40_000,
        average_video_plays: 55_000,
        created_at: Utc::now(),
    }
}

fn metric(label: &str, score: i32) -> MetricVerdict {
    MetricVerdict {
        label: label.to_string(),
        score,
        explanation: "because".to_string(),
        suggestion: "try".to_string(),
    }
}

/// A schema-complete LLM verdict with all six canonical metrics and no
/// optional content (tests add segments, giveaways, etc. as needed).
pub fn test_analysis() -> AnalysisResponse {
    let mut analysis = AnalysisResponse::default();
    analysis.summary.big_idea = "Editing shortcuts".to_string();
    analysis.summary.why_viral = "Curiosity-driven save bait".to_string();
    analysis.summary.audience_sentiment = "Grateful, saving for later".to_string();
    analysis.summary.sentiment_score = 74;
    analysis.analysis.scope.level = "Global".to_string();
    analysis.analysis.scope.confidence = 40;
    analysis.analysis.metrics = vec![
        metric("Hook Strength", 82),
        metric("Topic Potential", 71),
        metric("Pacing", 64),
        metric("Value Delivery", 58),
        metric("Shareability", 66),
        metric("CTA", 45),
    ];
    analysis.analysis.strengths = vec!["Tight pacing".to_string()];
    analysis.analysis.weaknesses = vec!["Below page average views".to_string()];
    analysis.remix.hook_ideas = vec!["Open on the broken edit".to_string()];
    analysis.remix.script_ideas = vec!["Before/after split".to_string()];
    analysis.publish.captions.casual = "editing but faster".to_string();
    analysis.publish.captions.professional = "Three timeline techniques".to_string();
    analysis.publish.captions.viral = "you're editing wrong".to_string();
    analysis.publish.hashtags = vec!["#editing".to_string(), "#reels".to_string()];
    analysis
}
