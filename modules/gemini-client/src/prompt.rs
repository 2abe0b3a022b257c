//! Prompt and request-body construction for the video analysis call.

use serde_json::{json, Value};

use crate::types::VideoAnalysisRequest;

pub(crate) fn build_prompt(req: &VideoAnalysisRequest) -> String {
    let published = req
        .published_at
        .map(|t| t.to_rfc2822())
        .unwrap_or_else(|| "unknown".to_string());
    let now = chrono::Utc::now().to_rfc2822();
    let stats = serde_json::to_string(&req.stats).unwrap_or_default();
    let average_stats = serde_json::to_string(&req.average_stats).unwrap_or_default();
    let coauthors = req.coauthors.join("|");
    let comments = req.comments.join("|");

    format!(
        r#"Act as a senior {platform} Content & Growth Analyst with a critical, data-driven mindset.
Your task is to analyze the provided {platform} video honestly and precisely.
Do NOT hype. Do NOT add extra sections. Do NOT invent fields.

You MUST return ONLY a valid JSON object that EXACTLY matches the schema provided below.
Any deviation, extra field, missing field, or rewording of keys is NOT allowed.

[CONTEXT DATA]:
- Video Caption: {caption}
- Caption Language: {caption_language}
- Co-Authors: {coauthors}
- Video Engagement Stats: {stats}
- Page Average Engagement Stats (last posts): {average_stats}
- Audience Comments (sample): {comments}
- Timing: Published at {published} (Current Time: {now})
- Target Region: {region}

--------------------------------
MANDATORY ANALYSIS RULES
--------------------------------

1. BASELINE COMPARISON (CRITICAL)
- Always evaluate this post relative to the page's own historical averages.
- If Views, Likes, or Comments are BELOW page average, you MUST reflect this negatively
  in scores, explanations, and weaknesses.

2. ENGAGEMENT QUALITY
- Distinguish between CTA-driven comments (repeated single-word replies) and organic
  engagement (opinions, emotional reactions, discussion).
- High comment count alone does NOT mean virality.

3. VALUE CLARITY
- If the video mainly validates emotions and delays real value to an external offer,
  reflect this clearly in Value Delivery scoring and suggestions.

4. VIRALITY HONESTY
- Do NOT label content as viral unless it meaningfully exceeds page averages
  or clearly penetrates non-follower feeds.
- Funnel effectiveness is not virality.

5. TOPIC AND SCOPE SCORING
- When judging trends or waves, always take into account the publish time ({published}),
  the target region ({region}), and any recognizable personalities detected in the frames.
- Only assign a Topic score of 90+ if search confirms a current cultural wave or event
  relevant to that time and region. Otherwise classify the topic as Evergreen/Saturated
  and score conservatively (80 or below).
- Report the topic's geographic reach in `analysis.scope` as Local, National, or Global,
  with a 0-100 confidence.

6. TRANSCRIPTION
- Transcribe spoken content into `content.segments`, one segment per speaker turn,
  in the language actually spoken. Segments may be in different languages.
- Detect giveaways explicitly: set `content.giveaway.is_detected` only when the video or
  caption announces a prize, and fill prize/requirements/deadline from what is stated.

--------------------------------
OUTPUT FORMAT (STRICT)
--------------------------------

Return ONLY the following JSON structure.
Use clear, concise language inside values. Scores must be realistic and justified.

{{
  "summary": {{
    "big_idea": "The core message/value proposition.",
    "why_viral": "Whether it truly went viral or what psychological trigger it relies on instead.",
    "audience_sentiment": "How the audience emotionally and cognitively reacted.",
    "sentiment_score": 0
  }},
  "content": {{
    "hook": "Analysis of the first 3 seconds: visual hook, verbal hook, pattern interruption.",
    "summary": "A faithful prose summary of the video, in the video's own language.",
    "key_points": ["The distinct points of value the video delivers"],
    "trend_metadata": "Sounds, challenges, or waves the content rides, if any.",
    "giveaway": {{
      "is_detected": false,
      "prize": "",
      "requirements": "",
      "deadline": ""
    }},
    "segments": [
      {{
        "speaker": "Identity (e.g. Creator, Narrator)",
        "timestamp": "[MM:SS]",
        "content": "Transcribed or summarized spoken content",
        "language": "Language name",
        "language_code": "ISO 639-1 code",
        "emotion": "happy | sad | angry | neutral | anxious | hopeful"
      }}
    ]
  }},
  "analysis": {{
    "scope": {{ "level": "Local | National | Global", "confidence": 0 }},
    "metrics": [
      {{
        "label": "Hook Strength | Topic Potential | Pacing | Value Delivery | Shareability | CTA",
        "score": 0,
        "explanation": "Data-backed rationale for the score.",
        "suggestion": "Specific and actionable improvement."
      }}
    ],
    "strengths": ["Clear, concrete strengths based on data and structure"],
    "weaknesses": ["Clear, concrete weaknesses based on performance and saturation"]
  }},
  "remix": {{
    "hook_ideas": ["3 alternative opening hooks that are sharper or more disruptive"],
    "script_ideas": ["3 alternative script angles or narratives"]
  }},
  "publish": {{
    "captions": {{
      "casual": "Conversational caption",
      "professional": "Clean, authority-based caption",
      "viral": "Short, punchy, curiosity-driven caption"
    }},
    "hashtags": ["5-10 relevant and currently popular hashtags for the region"]
  }}
}}

--------------------------------
FINAL INSTRUCTIONS
--------------------------------

- Output ONLY valid JSON.
- Do NOT include markdown, explanations, or commentary outside the JSON.
- Do NOT add, rename, or remove fields.
- Be analytical, not motivational.
- Assume the reader will use this output programmatically."#,
        platform = req.platform,
        caption = req.caption,
        caption_language = req.caption_language.as_deref().unwrap_or("unknown"),
        coauthors = coauthors,
        stats = stats,
        average_stats = average_stats,
        comments = comments,
        published = published,
        now = now,
        region = req.target_region,
    )
}

/// Full generateContent request body: the video reference, the prompt, the
/// search tool, and a response schema the model is constrained to.
pub(crate) fn build_request_body(req: &VideoAnalysisRequest, prompt: &str) -> Value {
    json!({
        "contents": [
            {
                "parts": [
                    {
                        "file_data": {
                            "file_uri": req.video_url,
                            "mime_type": "video/mp4"
                        },
                        "video_metadata": { "fps": 0.5 }
                    },
                    { "text": prompt }
                ]
            }
        ],
        "tools": [
            { "google_search": {} }
        ],
        "generation_config": {
            "temperature": 0.2,
            "response_schema": response_schema()
        }
    })
}

fn response_schema() -> Value {
    let str_array = || json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "OBJECT",
                "properties": {
                    "big_idea": { "type": "STRING" },
                    "why_viral": { "type": "STRING" },
                    "audience_sentiment": { "type": "STRING" },
                    "sentiment_score": { "type": "INTEGER", "description": "0 to 100 scale of audience sentiment" }
                }
            },
            "content": {
                "type": "OBJECT",
                "properties": {
                    "hook": { "type": "STRING" },
                    "summary": { "type": "STRING" },
                    "key_points": str_array(),
                    "trend_metadata": { "type": "STRING" },
                    "giveaway": {
                        "type": "OBJECT",
                        "properties": {
                            "is_detected": { "type": "BOOLEAN" },
                            "prize": { "type": "STRING" },
                            "requirements": { "type": "STRING" },
                            "deadline": { "type": "STRING" }
                        }
                    },
                    "segments": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "speaker": { "type": "STRING" },
                                "timestamp": { "type": "STRING" },
                                "content": { "type": "STRING" },
                                "language": { "type": "STRING" },
                                "language_code": { "type": "STRING" },
                                "emotion": { "type": "STRING", "enum": ["happy", "sad", "angry", "neutral", "anxious", "hopeful"] }
                            }
                        }
                    }
                }
            },
            "analysis": {
                "type": "OBJECT",
                "properties": {
                    "scope": {
                        "type": "OBJECT",
                        "properties": {
                            "level": { "type": "STRING", "enum": ["Local", "National", "Global"] },
                            "confidence": { "type": "INTEGER" }
                        }
                    },
                    "metrics": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "label": { "type": "STRING" },
                                "score": { "type": "INTEGER" },
                                "explanation": { "type": "STRING" },
                                "suggestion": { "type": "STRING" }
                            }
                        }
                    },
                    "strengths": str_array(),
                    "weaknesses": str_array()
                }
            },
            "remix": {
                "type": "OBJECT",
                "properties": {
                    "hook_ideas": str_array(),
                    "script_ideas": str_array()
                }
            },
            "publish": {
                "type": "OBJECT",
                "properties": {
                    "captions": {
                        "type": "OBJECT",
                        "properties": {
                            "casual": { "type": "STRING" },
                            "professional": { "type": "STRING" },
                            "viral": { "type": "STRING" }
                        }
                    },
                    "hashtags": str_array()
                }
            }
        },
        "required": ["summary", "content", "analysis", "remix", "publish"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request() -> VideoAnalysisRequest {
        let mut stats = BTreeMap::new();
        stats.insert("likes".to_string(), 4200.0);
        stats.insert("engagement_rate".to_string(), 3.75);
        VideoAnalysisRequest {
            platform: "instagram".to_string(),
            video_url: "https://cdn.example/clip.mp4".to_string(),
            caption: "three tricks for faster edits".to_string(),
            caption_language: Some("en".to_string()),
            coauthors: vec!["cutroom".to_string()],
            comments: vec!["part 2 please".to_string(), "saved".to_string()],
            stats,
            average_stats: BTreeMap::new(),
            published_at: None,
            target_region: "Germany".to_string(),
        }
    }

    #[test]
    fn prompt_carries_context_fields() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("three tricks for faster edits"));
        assert!(prompt.contains("cutroom"));
        assert!(prompt.contains("part 2 please|saved"));
        assert!(prompt.contains("\"likes\":4200.0"));
        assert!(prompt.contains("Caption Language: en"));
        assert!(prompt.contains("Target Region: Germany"));
        assert!(prompt.contains("Published at unknown"));
    }

    #[test]
    fn request_body_includes_video_and_schema() {
        let req = request();
        let body = build_request_body(&req, "prompt text");
        assert_eq!(
            body["contents"][0]["parts"][0]["file_data"]["file_uri"],
            "https://cdn.example/clip.mp4"
        );
        assert_eq!(body["contents"][0]["parts"][1]["text"], "prompt text");
        let required = body["generation_config"]["response_schema"]["required"]
            .as_array()
            .unwrap();
        assert_eq!(required.len(), 5);
    }
}
