//! Converts scraped data plus the LLM verdict into typed, language-tagged
//! content records and one analysis record.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use clipsight_common::{
    AnalysisCaptions, AnalysisMetric, ClipsightError, ContentKind, ContentMetadata, Post,
    PostAnalysis, PostContent, ReelSnapshot,
};
use gemini_client::{AnalysisResponse, MetricVerdict};

use crate::language::LanguageDetect;
use crate::scoring::{self, QualityMetrics};

/// Output of one normalize run: the full replacement content set plus the
/// analysis record, persisted all-or-nothing by the caller.
pub struct NormalizedRun {
    pub contents: Vec<PostContent>,
    pub analysis: PostAnalysis,
}

pub struct ContentNormalizer {
    detector: Arc<dyn LanguageDetect>,
}

impl ContentNormalizer {
    pub fn new(detector: Arc<dyn LanguageDetect>) -> Self {
        Self { detector }
    }

    pub fn normalize(
        &self,
        post: &Post,
        reel: &ReelSnapshot,
        analysis: &AnalysisResponse,
    ) -> Result<NormalizedRun, ClipsightError> {
        let mut contents = Vec::new();
        let post_id = &post.id;

        // Caption text and caption language both come from the scrape,
        // not from the LLM's claim.
        if let Some(caption) = reel.caption.as_deref().filter(|c| !c.is_empty()) {
            contents.push(PostContent::new(
                post_id,
                ContentKind::Caption,
                self.detector.detect(caption),
                caption,
                None,
            )?);
        }

        if !analysis.content.summary.is_empty() {
            contents.push(PostContent::new(
                post_id,
                ContentKind::Summary,
                self.detector.detect(&analysis.content.summary),
                &analysis.content.summary,
                None,
            )?);
        }

        // Segments may be multilingual within one post; each is tagged
        // from its own text.
        for segment in &analysis.content.segments {
            contents.push(PostContent::new(
                post_id,
                ContentKind::Transcript,
                self.detector.detect(&segment.content),
                &segment.content,
                Some(ContentMetadata::Segment {
                    timestamp: segment.timestamp.clone(),
                    speaker: segment.speaker.clone(),
                    emotion: segment.emotion.clone(),
                }),
            )?);
        }

        for point in &analysis.content.key_points {
            contents.push(PostContent::new(
                post_id,
                ContentKind::KeyPoint,
                self.detector.detect(point),
                point,
                None,
            )?);
        }

        // The hook doubles as a key point when there is spoken content to
        // anchor it to.
        if !analysis.content.hook.is_empty() && !analysis.content.segments.is_empty() {
            contents.push(PostContent::new(
                post_id,
                ContentKind::KeyPoint,
                self.detector.detect(&analysis.content.hook),
                &analysis.content.hook,
                None,
            )?);
        }

        if !analysis.content.trend_metadata.is_empty() {
            contents.push(PostContent::new(
                post_id,
                ContentKind::TrendMetadata,
                Some("en".to_string()),
                &analysis.content.trend_metadata,
                None,
            )?);
        }

        // Giveaways are emitted only on an explicit provider flag.
        let giveaway = &analysis.content.giveaway;
        if giveaway.is_detected {
            let text = format!(
                "Prize: {}\nRequirements: {}\nDeadline: {}",
                giveaway.prize, giveaway.requirements, giveaway.deadline
            );
            contents.push(PostContent::new(
                post_id,
                ContentKind::Giveaway,
                Some("en".to_string()),
                text,
                Some(ContentMetadata::Giveaway {
                    prize: giveaway.prize.clone(),
                    requirements: giveaway.requirements.clone(),
                    deadline: giveaway.deadline.clone(),
                }),
            )?);
        }

        let analysis_record = self.build_analysis(post_id, analysis);

        Ok(NormalizedRun {
            contents,
            analysis: analysis_record,
        })
    }

    fn build_analysis(&self, post_id: &str, analysis: &AnalysisResponse) -> PostAnalysis {
        let metrics = extract_quality_metrics(&analysis.analysis.metrics);
        let scope = &analysis.analysis.scope;
        let viral_score = scoring::viral_score(metrics, scope.confidence, &scope.level);

        let now = Utc::now();
        PostAnalysis {
            id: Uuid::new_v4(),
            post_id: post_id.to_string(),
            viral_score,
            big_idea: analysis.summary.big_idea.clone(),
            why_viral: analysis.summary.why_viral.clone(),
            audience_sentiment: analysis.summary.audience_sentiment.clone(),
            sentiment_score: analysis.summary.sentiment_score,
            scope: scope.level.clone(),
            scope_confidence: scope.confidence,
            metrics: analysis
                .analysis
                .metrics
                .iter()
                .map(|m| AnalysisMetric {
                    label: m.label.clone(),
                    score: m.score,
                    explanation: m.explanation.clone(),
                    suggestion: m.suggestion.clone(),
                })
                .collect(),
            strengths: analysis.analysis.strengths.clone(),
            weaknesses: analysis.analysis.weaknesses.clone(),
            hook_ideas: analysis.remix.hook_ideas.clone(),
            script_ideas: analysis.remix.script_ideas.clone(),
            captions: AnalysisCaptions {
                casual: analysis.publish.captions.casual.clone(),
                professional: analysis.publish.captions.professional.clone(),
                viral: analysis.publish.captions.viral.clone(),
            },
            hashtags: analysis.publish.hashtags.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Scan the named metric list for the six canonical scores by
/// case-insensitive substring match on the label. Anything not found
/// defaults to 0.
pub fn extract_quality_metrics(metrics: &[MetricVerdict]) -> QualityMetrics {
    let mut out = QualityMetrics::default();
    for metric in metrics {
        let label = metric.label.to_lowercase();
        if label.contains("topic") {
            out.topic = metric.score;
        } else if label.contains("hook") {
            out.hook = metric.score;
        } else if label.contains("pacing") {
            out.pacing = metric.score;
        } else if label.contains("value") {
            out.value_delivery = metric.score;
        } else if label.contains("share") {
            out.shareability = metric.score;
        } else if label.contains("cta") {
            out.cta = metric.score;
        }
    }
    out
}

/// Same extraction, over the persisted verdict. Used by renew jobs to
/// re-score without re-invoking the LLM.
pub fn extract_stored_metrics(metrics: &[AnalysisMetric]) -> QualityMetrics {
    let verdicts: Vec<MetricVerdict> = metrics
        .iter()
        .map(|m| MetricVerdict {
            label: m.label.clone(),
            score: m.score,
            explanation: String::new(),
            suggestion: String::new(),
        })
        .collect();
    extract_quality_metrics(&verdicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use gemini_client::TranscriptSegment;

    fn normalizer() -> ContentNormalizer {
        let detector = Arc::new(
            FixedDetector::new()
                .on_text("so heute zeige ich euch drei tricks", "de")
                .on_text("and now the english part", "en")
                .on_text("drei tricks für schnellere edits", "de"),
        );
        ContentNormalizer::new(detector)
    }

    fn segment(content: &str) -> TranscriptSegment {
        TranscriptSegment {
            speaker: "Creator".to_string(),
            timestamp: "[00:03]".to_string(),
            content: content.to_string(),
            language: String::new(),
            language_code: String::new(),
            emotion: "neutral".to_string(),
        }
    }

    #[test]
    fn multilingual_segments_get_their_own_language_tags() {
        let mut analysis = test_analysis();
        analysis.content.segments = vec![
            segment("so heute zeige ich euch drei tricks"),
            segment("and now the english part"),
        ];

        let post = test_post("Cxyz_12-Ab");
        let reel = test_reel("Cxyz_12-Ab", "editlab");
        let run = normalizer().normalize(&post, &reel, &analysis).unwrap();

        let transcript: Vec<_> = run
            .contents
            .iter()
            .filter(|c| c.kind == ContentKind::Transcript)
            .collect();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].language.as_deref(), Some("de"));
        assert_eq!(transcript[1].language.as_deref(), Some("en"));
    }

    #[test]
    fn caption_language_comes_from_the_scraped_text() {
        let analysis = test_analysis();
        let post = test_post("Cxyz_12-Ab");
        let mut reel = test_reel("Cxyz_12-Ab", "editlab");
        reel.caption = Some("drei tricks für schnellere edits".to_string());

        let run = normalizer().normalize(&post, &reel, &analysis).unwrap();

        let caption = run
            .contents
            .iter()
            .find(|c| c.kind == ContentKind::Caption)
            .unwrap();
        assert_eq!(caption.language.as_deref(), Some("de"));
        assert_eq!(caption.text, "drei tricks für schnellere edits");
    }

    #[test]
    fn transcript_rows_carry_segment_metadata() {
        let mut analysis = test_analysis();
        analysis.content.segments = vec![segment("and now the english part")];

        let post = test_post("Cxyz_12-Ab");
        let reel = test_reel("Cxyz_12-Ab", "editlab");
        let run = normalizer().normalize(&post, &reel, &analysis).unwrap();

        let row = run
            .contents
            .iter()
            .find(|c| c.kind == ContentKind::Transcript)
            .unwrap();
        match row.metadata.as_ref().unwrap() {
            ContentMetadata::Segment {
                timestamp,
                speaker,
                emotion,
            } => {
                assert_eq!(timestamp, "[00:03]");
                assert_eq!(speaker, "Creator");
                assert_eq!(emotion, "neutral");
            }
            other => panic!("expected segment metadata, got {other:?}"),
        }
    }

    #[test]
    fn giveaway_requires_the_explicit_flag() {
        let mut analysis = test_analysis();
        analysis.content.giveaway.prize = "AirPods".to_string();
        analysis.content.giveaway.is_detected = false;

        let post = test_post("Cxyz_12-Ab");
        let reel = test_reel("Cxyz_12-Ab", "editlab");
        let run = normalizer().normalize(&post, &reel, &analysis).unwrap();
        assert!(!run.contents.iter().any(|c| c.kind == ContentKind::Giveaway));

        analysis.content.giveaway.is_detected = true;
        analysis.content.giveaway.requirements = "follow and tag a friend".to_string();
        analysis.content.giveaway.deadline = "Friday".to_string();
        let run = normalizer().normalize(&post, &reel, &analysis).unwrap();

        let giveaway = run
            .contents
            .iter()
            .find(|c| c.kind == ContentKind::Giveaway)
            .unwrap();
        assert!(giveaway.text.contains("Prize: AirPods"));
        assert!(matches!(
            giveaway.metadata,
            Some(ContentMetadata::Giveaway { .. })
        ));
    }

    #[test]
    fn hook_becomes_a_key_point_only_with_spoken_content() {
        let mut analysis = test_analysis();
        analysis.content.hook = "Cold-open on the finished edit".to_string();
        analysis.content.key_points.clear();
        analysis.content.segments.clear();

        let post = test_post("Cxyz_12-Ab");
        let reel = test_reel("Cxyz_12-Ab", "editlab");

        let run = normalizer().normalize(&post, &reel, &analysis).unwrap();
        assert!(!run.contents.iter().any(|c| c.kind == ContentKind::KeyPoint));

        analysis.content.segments = vec![segment("and now the english part")];
        let run = normalizer().normalize(&post, &reel, &analysis).unwrap();
        let key_points: Vec<_> = run
            .contents
            .iter()
            .filter(|c| c.kind == ContentKind::KeyPoint)
            .collect();
        assert_eq!(key_points.len(), 1);
        assert_eq!(key_points[0].text, "Cold-open on the finished edit");
    }

    #[test]
    fn analysis_record_passes_through_and_scores() {
        let analysis = test_analysis();
        let post = test_post("Cxyz_12-Ab");
        let reel = test_reel("Cxyz_12-Ab", "editlab");

        let run = normalizer().normalize(&post, &reel, &analysis).unwrap();
        let record = &run.analysis;

        assert_eq!(record.post_id, "Cxyz_12-Ab");
        assert_eq!(record.sentiment_score, analysis.summary.sentiment_score);
        assert_eq!(record.metrics.len(), analysis.analysis.metrics.len());
        assert_eq!(record.scope, "Global");

        let expected = scoring::viral_score(
            extract_quality_metrics(&analysis.analysis.metrics),
            analysis.analysis.scope.confidence,
            &analysis.analysis.scope.level,
        );
        assert_eq!(record.viral_score, expected);
    }

    #[test]
    fn canonical_metrics_extracted_by_substring() {
        let verdicts = vec![
            MetricVerdict {
                label: "Hook Strength".to_string(),
                score: 82,
                ..Default::default()
            },
            MetricVerdict {
                label: "TOPIC potential".to_string(),
                score: 71,
                ..Default::default()
            },
            MetricVerdict {
                label: "Pacing".to_string(),
                score: 64,
                ..Default::default()
            },
            MetricVerdict {
                label: "Value Delivery".to_string(),
                score: 58,
                ..Default::default()
            },
            MetricVerdict {
                label: "shareability".to_string(),
                score: 66,
                ..Default::default()
            },
            MetricVerdict {
                label: "CTA".to_string(),
                score: 45,
                ..Default::default()
            },
        ];
        let m = extract_quality_metrics(&verdicts);
        assert_eq!(
            m,
            QualityMetrics {
                topic: 71,
                hook: 82,
                pacing: 64,
                value_delivery: 58,
                shareability: 66,
                cta: 45,
            }
        );
    }

    #[test]
    fn missing_metrics_default_to_zero() {
        let verdicts = vec![MetricVerdict {
            label: "Hook Strength".to_string(),
            score: 82,
            ..Default::default()
        }];
        let m = extract_quality_metrics(&verdicts);
        assert_eq!(m.hook, 82);
        assert_eq!(m.topic, 0);
        assert_eq!(m.cta, 0);
    }
}
