use chrono::{DateTime, Utc};
use serde::Deserialize;

// --- Single reel lookup ---

/// A single Instagram reel as returned by the media-data endpoint.
/// Field names mirror the provider's GraphQL-shaped JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReelData {
    pub id: Option<String>,
    pub shortcode: Option<String>,
    #[serde(rename = "display_url")]
    pub display_url: Option<String>,
    #[serde(rename = "video_url")]
    pub video_url: Option<String>,
    #[serde(rename = "video_view_count")]
    pub video_view_count: Option<i64>,
    #[serde(rename = "video_play_count")]
    pub video_play_count: Option<i64>,
    #[serde(rename = "taken_at_timestamp")]
    pub taken_at_timestamp: Option<i64>,
    #[serde(rename = "edge_media_preview_like")]
    pub likes: Option<EdgeCount>,
    #[serde(rename = "edge_media_to_caption")]
    pub caption_edges: Option<CaptionEdges>,
    #[serde(rename = "edge_media_to_parent_comment")]
    pub comment_edges: Option<CommentEdges>,
    pub owner: Option<Owner>,
    #[serde(rename = "coauthor_producers")]
    pub coauthor_producers: Option<Vec<CoauthorProducer>>,
}

impl ReelData {
    /// The caption text, when the post has one.
    pub fn caption(&self) -> Option<&str> {
        self.caption_edges
            .as_ref()?
            .edges
            .first()
            .map(|e| e.node.text.as_str())
    }

    /// Top-level comment texts in response order.
    pub fn comment_texts(&self) -> Vec<&str> {
        self.comment_edges
            .as_ref()
            .map(|c| c.edges.iter().map(|e| e.node.text.as_str()).collect())
            .unwrap_or_default()
    }

    /// Publish time derived from the provider's unix timestamp.
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at_timestamp
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
    }

    pub fn like_count(&self) -> i64 {
        self.likes.as_ref().map(|l| l.count).unwrap_or(0)
    }

    pub fn comment_count(&self) -> i64 {
        self.comment_edges.as_ref().map(|c| c.count).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdgeCount {
    pub count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptionEdges {
    pub edges: Vec<CaptionEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionEdge {
    pub node: CaptionNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionNode {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentEdges {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub edges: Vec<CommentEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentEdge {
    pub node: CommentNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentNode {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Owner {
    pub username: Option<String>,
    #[serde(rename = "full_name")]
    pub full_name: Option<String>,
    #[serde(rename = "profile_pic_url")]
    pub profile_pic_url: Option<String>,
    #[serde(rename = "edge_followed_by")]
    pub followers: Option<EdgeCount>,
    #[serde(rename = "edge_follow")]
    pub following: Option<EdgeCount>,
    #[serde(rename = "edge_owner_to_timeline_media")]
    pub media: Option<EdgeCount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoauthorProducer {
    pub username: Option<String>,
}

// --- Author recent-reels sample ---

/// One page of an author's recent reels.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReelsPage {
    #[serde(default)]
    pub reels: Vec<ReelEdge>,
    #[serde(rename = "pagination_token", default)]
    pub pagination_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReelEdge {
    pub node: ReelNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReelNode {
    pub media: Media,
}

/// Engagement counters for one reel in the sample.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Media {
    pub code: Option<String>,
    #[serde(rename = "like_count")]
    pub like_count: Option<i64>,
    #[serde(rename = "comment_count")]
    pub comment_count: Option<i64>,
    #[serde(rename = "play_count")]
    pub play_count: Option<i64>,
    #[serde(rename = "view_count")]
    pub view_count: Option<i64>,
}
