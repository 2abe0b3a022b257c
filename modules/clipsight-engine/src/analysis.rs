//! Builds the contextual prompt payload and drives the one-shot LLM call,
//! capturing the raw exchange for audit regardless of outcome.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use clipsight_common::{ChannelHistory, Post, ReelSnapshot, COMMENT_SAMPLE_MAX};
use gemini_client::{AnalysisResponse, GeminiError, VideoAnalysisRequest};

use crate::language::LanguageDetect;
use crate::traits::VideoAnalyst;

/// A successful analysis with its audit trail.
pub struct AnalysisOutcome {
    pub raw_request: String,
    pub raw_response: String,
    pub analysis: AnalysisResponse,
}

/// A failed analysis. The raw exchange is present whenever the call got
/// far enough to produce one, so the audit trail survives failures too.
#[derive(Debug)]
pub struct AnalysisFailure {
    pub reason: String,
    pub raw_request: Option<String>,
    pub raw_response: Option<String>,
}

pub struct AnalysisOrchestrator {
    analyst: Arc<dyn VideoAnalyst>,
    detector: Arc<dyn LanguageDetect>,
    target_region: String,
}

impl AnalysisOrchestrator {
    pub fn new(
        analyst: Arc<dyn VideoAnalyst>,
        detector: Arc<dyn LanguageDetect>,
        target_region: impl Into<String>,
    ) -> Self {
        Self {
            analyst,
            detector,
            target_region: target_region.into(),
        }
    }

    pub async fn analyze(
        &self,
        post: &Post,
        reel: &ReelSnapshot,
        history: Option<&ChannelHistory>,
    ) -> Result<AnalysisOutcome, AnalysisFailure> {
        let video_url = reel
            .video_url
            .clone()
            .or_else(|| post.video_url.clone())
            .ok_or_else(|| AnalysisFailure {
                reason: "reel has no video to analyze".to_string(),
                raw_request: None,
                raw_response: None,
            })?;

        let caption = reel.caption.clone().unwrap_or_default();
        let caption_language = self.detector.detect(&caption);

        let request = VideoAnalysisRequest {
            platform: "instagram".to_string(),
            video_url,
            caption,
            caption_language,
            coauthors: reel.coauthors.clone(),
            comments: reel
                .comments
                .iter()
                .take(COMMENT_SAMPLE_MAX)
                .cloned()
                .collect(),
            stats: engagement_stats(reel),
            average_stats: history.map(average_stats).unwrap_or_default(),
            published_at: reel.posted_at.or(post.posted_at),
            target_region: self.target_region.clone(),
        };

        info!(post_id = %post.id, "Starting video analysis");

        match self.analyst.analyze(&request).await {
            Ok(exchange) => Ok(AnalysisOutcome {
                raw_request: exchange.raw_request,
                raw_response: exchange.raw_response,
                analysis: exchange.analysis,
            }),
            Err(e) => {
                let (raw_request, raw_response) = match e.downcast_ref::<GeminiError>() {
                    Some(gemini) => (
                        gemini.raw_request().map(str::to_string),
                        gemini.raw_response().map(str::to_string),
                    ),
                    None => (None, None),
                };
                Err(AnalysisFailure {
                    reason: format!("video analysis failed: {e:#}"),
                    raw_request,
                    raw_response,
                })
            }
        }
    }
}

/// Engagement counters for the target reel. The rate is omitted when the
/// author's follower count is unknown or zero, never NaN or infinite.
fn engagement_stats(reel: &ReelSnapshot) -> BTreeMap<String, f64> {
    let mut stats = BTreeMap::new();
    stats.insert("likes".to_string(), reel.like_count as f64);
    stats.insert("comments".to_string(), reel.comment_count as f64);
    stats.insert("views".to_string(), reel.video_view_count as f64);
    stats.insert("plays".to_string(), reel.video_play_count as f64);

    if reel.followers_count > 0 {
        let rate = (reel.like_count + reel.comment_count) as f64 / reel.followers_count as f64
            * 100.0;
        stats.insert("engagement_rate".to_string(), rate);
    }

    stats
}

/// Channel-average counters. An empty map means "no baseline": a sample
/// with zero aggregate likes would present a misleading comparison, so it
/// is treated the same as no sample at all.
fn average_stats(history: &ChannelHistory) -> BTreeMap<String, f64> {
    let mut stats = BTreeMap::new();
    if history.average_likes == 0 {
        return stats;
    }

    stats.insert("likes".to_string(), history.average_likes as f64);
    stats.insert("comments".to_string(), history.average_comments as f64);
    stats.insert("views".to_string(), history.average_video_views as f64);
    stats.insert("plays".to_string(), history.average_video_plays as f64);

    if history.followers_count > 0 {
        let rate = (history.average_likes + history.average_comments) as f64
            / history.followers_count as f64
            * 100.0;
        stats.insert("engagement_rate".to_string(), rate);
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn orchestrator(analyst: Arc<MockAnalyst>) -> AnalysisOrchestrator {
        let detector = Arc::new(FixedDetector::new().on_text("hola amigos", "es"));
        AnalysisOrchestrator::new(analyst, detector, "Global")
    }

    #[tokio::test]
    async fn builds_context_with_engagement_rate() {
        let analyst = Arc::new(MockAnalyst::new().with_response(test_analysis()));
        let o = orchestrator(analyst.clone());

        let post = test_post("Cxyz_12-Ab");
        let reel = test_reel("Cxyz_12-Ab", "editlab");
        let history = test_history(reel.followers_count);

        o.analyze(&post, &reel, Some(&history)).await.unwrap();

        let seen = analyst.last_request().unwrap();
        // (4200 + 310) / 120000 * 100
        let rate = seen.stats["engagement_rate"];
        assert!((rate - 3.758_333_333).abs() < 1e-6);
        assert_eq!(seen.stats["likes"], 4200.0);
        assert!(seen.average_stats.contains_key("engagement_rate"));
        assert_eq!(seen.platform, "instagram");
    }

    #[tokio::test]
    async fn zero_followers_omits_engagement_rate() {
        let analyst = Arc::new(MockAnalyst::new().with_response(test_analysis()));
        let o = orchestrator(analyst.clone());

        let post = test_post("Cxyz_12-Ab");
        let mut reel = test_reel("Cxyz_12-Ab", "editlab");
        reel.followers_count = 0;

        o.analyze(&post, &reel, None).await.unwrap();

        let seen = analyst.last_request().unwrap();
        assert!(!seen.stats.contains_key("engagement_rate"));
        assert!(seen.stats["likes"].is_finite());
    }

    #[tokio::test]
    async fn zero_aggregate_likes_means_no_baseline() {
        let analyst = Arc::new(MockAnalyst::new().with_response(test_analysis()));
        let o = orchestrator(analyst.clone());

        let post = test_post("Cxyz_12-Ab");
        let reel = test_reel("Cxyz_12-Ab", "editlab");
        let mut history = test_history(reel.followers_count);
        history.average_likes = 0;

        o.analyze(&post, &reel, Some(&history)).await.unwrap();

        assert!(analyst.last_request().unwrap().average_stats.is_empty());
    }

    #[tokio::test]
    async fn comment_sample_is_capped() {
        let analyst = Arc::new(MockAnalyst::new().with_response(test_analysis()));
        let o = orchestrator(analyst.clone());

        let post = test_post("Cxyz_12-Ab");
        let mut reel = test_reel("Cxyz_12-Ab", "editlab");
        reel.comments = (0..100).map(|i| format!("comment {i}")).collect();

        o.analyze(&post, &reel, None).await.unwrap();

        assert_eq!(analyst.last_request().unwrap().comments.len(), COMMENT_SAMPLE_MAX);
    }

    #[tokio::test]
    async fn caption_language_is_detected_from_scraped_text() {
        let analyst = Arc::new(MockAnalyst::new().with_response(test_analysis()));
        let o = orchestrator(analyst.clone());

        let post = test_post("Cxyz_12-Ab");
        let mut reel = test_reel("Cxyz_12-Ab", "editlab");
        reel.caption = Some("hola amigos".to_string());

        o.analyze(&post, &reel, None).await.unwrap();

        assert_eq!(
            analyst.last_request().unwrap().caption_language.as_deref(),
            Some("es")
        );
    }

    #[tokio::test]
    async fn missing_video_is_a_hard_failure() {
        let analyst = Arc::new(MockAnalyst::new().with_response(test_analysis()));
        let o = orchestrator(analyst);

        let post = test_post("Cxyz_12-Ab");
        let mut reel = test_reel("Cxyz_12-Ab", "editlab");
        reel.video_url = None;

        let failure = o.analyze(&post, &reel, None).await.err().unwrap();
        assert!(failure.reason.contains("no video"));
    }

    #[tokio::test]
    async fn analyst_failure_keeps_the_audit_trail() {
        let analyst = Arc::new(MockAnalyst::new().with_error(|| {
            GeminiError::Schema {
                raw_request: "outbound-json".to_string(),
                raw_response: "inbound-garbage".to_string(),
                message: "missing field `analysis`".to_string(),
            }
        }));
        let o = orchestrator(analyst);

        let post = test_post("Cxyz_12-Ab");
        let reel = test_reel("Cxyz_12-Ab", "editlab");

        let failure = o.analyze(&post, &reel, None).await.err().unwrap();
        assert!(failure.reason.contains("missing field"));
        assert_eq!(failure.raw_request.as_deref(), Some("outbound-json"));
        assert_eq!(failure.raw_response.as_deref(), Some("inbound-garbage"));
    }
}
