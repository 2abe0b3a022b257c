use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClipsightError;
use crate::limits::{ESTIMATE_LONG_FORM_SECS, ESTIMATE_SHORT_FORM_SECS};

// --- Platforms ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialPlatform {
    Instagram,
    TikTok,
    YouTube,
    Twitter,
    Unknown,
}

impl SocialPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialPlatform::Instagram => "instagram",
            SocialPlatform::TikTok => "tiktok",
            SocialPlatform::YouTube => "youtube",
            SocialPlatform::Twitter => "twitter",
            SocialPlatform::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "instagram" => Some(SocialPlatform::Instagram),
            "tiktok" => Some(SocialPlatform::TikTok),
            "youtube" => Some(SocialPlatform::YouTube),
            "twitter" => Some(SocialPlatform::Twitter),
            "unknown" => Some(SocialPlatform::Unknown),
            _ => None,
        }
    }

    /// Submit-time processing estimate in seconds. Short-form platforms are
    /// dominated by one scrape + one LLM call; long-form video costs more.
    pub fn estimated_seconds(&self) -> u32 {
        match self {
            SocialPlatform::Instagram | SocialPlatform::TikTok | SocialPlatform::Twitter => {
                ESTIMATE_SHORT_FORM_SECS
            }
            SocialPlatform::YouTube => ESTIMATE_LONG_FORM_SECS,
            SocialPlatform::Unknown => 0,
        }
    }
}

impl std::fmt::Display for SocialPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Statuses ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "processing" => Some(RequestStatus::Processing),
            "completed" => Some(RequestStatus::Completed),
            "failed" => Some(RequestStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Post rows share the request lifecycle but are keyed by content, not by
/// submitter: several requests can point at one post.
pub type PostStatus = RequestStatus;

// --- Entities ---

/// One tracking record per (submitter, content) pair. Never hard-deleted;
/// its status is the lifecycle. The raw LLM exchange is kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_ip: String,
    pub link: String,
    pub post_id: Option<String>,
    pub status: RequestStatus,
    pub fail_reason: Option<String>,
    pub llm_request: Option<String>,
    pub llm_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row per unique content item, keyed by the provider shortcode so
/// repeated submissions of the same URL converge on one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub channel_id: Option<Uuid>,
    pub link: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub author_handle: String,
    pub author_name: String,
    pub author_profile_url: String,
    pub status: PostStatus,
    pub fail_reason: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub video_view_count: i64,
    pub video_play_count: i64,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row per distinct author handle. Aggregate stats live in
/// ChannelHistory snapshots; "current" stats are the latest snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub handle: String,
    pub display_name: String,
    pub platform: SocialPlatform,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of an author's aggregate stats at scrape time.
/// Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelHistory {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub followers_count: i64,
    pub following_count: i64,
    pub media_count: i64,
    pub average_likes: i64,
    pub average_comments: i64,
    pub average_video_views: i64,
    pub average_video_plays: i64,
    pub created_at: DateTime<Utc>,
}

// --- Post content ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Caption,
    Summary,
    Transcript,
    TrendMetadata,
    Giveaway,
    KeyPoint,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Caption => "caption",
            ContentKind::Summary => "summary",
            ContentKind::Transcript => "transcript",
            ContentKind::TrendMetadata => "trend_metadata",
            ContentKind::Giveaway => "giveaway",
            ContentKind::KeyPoint => "key_point",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "caption" => Some(ContentKind::Caption),
            "summary" => Some(ContentKind::Summary),
            "transcript" => Some(ContentKind::Transcript),
            "trend_metadata" => Some(ContentKind::TrendMetadata),
            "giveaway" => Some(ContentKind::Giveaway),
            "key_point" => Some(ContentKind::KeyPoint),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind-specific metadata. The variant must match the owning record's
/// content kind; `PostContent::new` enforces this at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentMetadata {
    Segment {
        timestamp: String,
        speaker: String,
        emotion: String,
    },
    Giveaway {
        prize: String,
        requirements: String,
        deadline: String,
    },
}

impl ContentMetadata {
    /// The content kind this metadata variant belongs to.
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentMetadata::Segment { .. } => ContentKind::Transcript,
            ContentMetadata::Giveaway { .. } => ContentKind::Giveaway,
        }
    }
}

/// A typed, language-tagged fragment of analysis output. Immutable once
/// written; a re-run replaces the whole set for the post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostContent {
    pub id: Uuid,
    pub post_id: String,
    pub kind: ContentKind,
    pub language: Option<String>,
    pub text: String,
    pub metadata: Option<ContentMetadata>,
    pub created_at: DateTime<Utc>,
}

impl PostContent {
    /// Build a content record, rejecting metadata whose variant does not
    /// match the kind tag.
    pub fn new(
        post_id: impl Into<String>,
        kind: ContentKind,
        language: Option<String>,
        text: impl Into<String>,
        metadata: Option<ContentMetadata>,
    ) -> Result<Self, ClipsightError> {
        if let Some(ref meta) = metadata {
            if meta.kind() != kind {
                return Err(ClipsightError::InvalidArgument(format!(
                    "content metadata variant {} does not match kind {}",
                    meta.kind(),
                    kind
                )));
            }
        }
        Ok(Self {
            id: Uuid::new_v4(),
            post_id: post_id.into(),
            kind,
            language,
            text: text.into(),
            metadata,
            created_at: Utc::now(),
        })
    }
}

// --- Post analysis ---

/// One named metric from the LLM verdict, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisMetric {
    pub label: String,
    pub score: i32,
    pub explanation: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisCaptions {
    pub casual: String,
    pub professional: String,
    pub viral: String,
}

/// The LLM-derived structured verdict for a post, one-to-one with the
/// post's latest completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAnalysis {
    pub id: Uuid,
    pub post_id: String,
    pub viral_score: f64,
    pub big_idea: String,
    pub why_viral: String,
    pub audience_sentiment: String,
    pub sentiment_score: i32,
    pub scope: String,
    pub scope_confidence: i32,
    pub metrics: Vec<AnalysisMetric>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub hook_ideas: Vec<String>,
    pub script_ideas: Vec<String>,
    pub captions: AnalysisCaptions,
    pub hashtags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Work queue ---

/// Job class. Fresh runs the full pipeline; renew refreshes engagement
/// stats and re-scores without re-fetching transcript or analysis content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Fresh,
    Renew,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Fresh => "fresh",
            JobKind::Renew => "renew",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fresh" => Some(JobKind::Fresh),
            "renew" => Some(JobKind::Renew),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Queue message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueJob {
    pub request_id: Uuid,
    pub post_id: Option<String>,
    pub url: String,
    pub platform: SocialPlatform,
}

// --- Scraped records ---

/// A single scraped reel, normalized from the provider's wire shape.
#[derive(Debug, Clone, Default)]
pub struct ReelSnapshot {
    pub shortcode: String,
    pub caption: Option<String>,
    pub author_handle: String,
    pub author_name: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub video_view_count: i64,
    pub video_play_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub media_count: i64,
    pub posted_at: Option<DateTime<Utc>>,
    pub coauthors: Vec<String>,
    pub comments: Vec<String>,
}

/// Engagement counters for one reel in the author's recent sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerReelStats {
    pub like_count: i64,
    pub comment_count: i64,
    pub video_view_count: i64,
    pub video_play_count: i64,
}
