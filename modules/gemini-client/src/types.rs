use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Outbound context ---

/// Everything the analysis prompt is built from. Engagement stat maps use
/// BTreeMap so the serialized request is deterministic.
#[derive(Debug, Clone)]
pub struct VideoAnalysisRequest {
    pub platform: String,
    pub video_url: String,
    pub caption: String,
    /// ISO 639-1 code detected from the caption text, when detectable.
    pub caption_language: Option<String>,
    pub coauthors: Vec<String>,
    pub comments: Vec<String>,
    pub stats: BTreeMap<String, f64>,
    pub average_stats: BTreeMap<String, f64>,
    pub published_at: Option<DateTime<Utc>>,
    pub target_region: String,
}

/// A completed analysis call: the serialized outbound request, the raw
/// inbound body, and the parsed result. Raw strings are persisted for
/// audit regardless of what downstream does with the result.
#[derive(Debug, Clone)]
pub struct AnalysisExchange {
    pub raw_request: String,
    pub raw_response: String,
    pub analysis: AnalysisResponse,
}

// --- Response schema ---
//
// The provider is instructed to emit exactly this object. The five
// top-level sections are required; a response missing any of them fails
// schema validation and is rejected whole.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub summary: AnalysisSummary,
    pub content: AnalysisContent,
    pub analysis: AnalysisVerdict,
    pub remix: RemixIdeas,
    pub publish: PublishKit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    #[serde(default)]
    pub big_idea: String,
    #[serde(default)]
    pub why_viral: String,
    #[serde(default)]
    pub audience_sentiment: String,
    #[serde(default)]
    pub sentiment_score: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisContent {
    #[serde(default)]
    pub hook: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub trend_metadata: String,
    #[serde(default)]
    pub giveaway: GiveawayDetection,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GiveawayDetection {
    #[serde(default)]
    pub is_detected: bool,
    #[serde(default)]
    pub prize: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub deadline: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub emotion: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisVerdict {
    #[serde(default)]
    pub scope: ScopeJudgment,
    pub metrics: Vec<MetricVerdict>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

/// The LLM's judgment of the topic's geographic reach.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeJudgment {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub confidence: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricVerdict {
    pub label: String,
    pub score: i32,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub suggestion: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemixIdeas {
    #[serde(default)]
    pub hook_ideas: Vec<String>,
    #[serde(default)]
    pub script_ideas: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishKit {
    #[serde(default)]
    pub captions: PublishCaptions,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishCaptions {
    #[serde(default)]
    pub casual: String,
    #[serde(default)]
    pub professional: String,
    #[serde(default)]
    pub viral: String,
}

// --- Provider envelope ---

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Candidate {
    pub content: CandidateContent,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CandidatePart {
    #[serde(default)]
    pub text: String,
}
