mod client;
pub mod error;
mod prompt;
pub mod types;

pub use error::{GeminiError, Result};
pub use types::{
    AnalysisExchange, AnalysisResponse, GiveawayDetection, MetricVerdict, ScopeJudgment,
    TranscriptSegment, VideoAnalysisRequest,
};

use client::{GeminiHttp, HttpFailure};
use types::GenerateContentResponse;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    model: String,
    base_url: String,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the one-shot video analysis call. The serialized outbound
    /// request and the raw inbound body are returned with the parsed
    /// result, and carried inside the error when parsing fails, so the
    /// caller can persist the exchange for audit either way.
    pub async fn analyze_video(&self, req: &VideoAnalysisRequest) -> Result<AnalysisExchange> {
        let prompt = prompt::build_prompt(req);
        let body = prompt::build_request_body(req, &prompt);
        let raw_request = body.to_string();

        tracing::info!(video_url = %req.video_url, model = %self.model, "Starting video analysis");

        let http = GeminiHttp::new(&self.api_key, &self.base_url);
        let raw_response = match http.generate(&self.model, &body).await {
            Ok(text) => text,
            Err(HttpFailure::Network(msg)) => return Err(GeminiError::Network(msg)),
            Err(HttpFailure::Status { status, body }) => {
                return Err(GeminiError::Api {
                    status,
                    body,
                    raw_request,
                })
            }
        };

        let analysis = parse_analysis(&raw_request, &raw_response)?;

        tracing::info!(
            segments = analysis.content.segments.len(),
            metrics = analysis.analysis.metrics.len(),
            "Video analysis parsed"
        );

        Ok(AnalysisExchange {
            raw_request,
            raw_response,
            analysis,
        })
    }
}

/// Walk the provider envelope and strictly parse the schema'd payload.
/// An empty candidate list and a schema violation are both hard failures;
/// there is no partial acceptance.
fn parse_analysis(raw_request: &str, raw_response: &str) -> Result<AnalysisResponse> {
    let envelope: GenerateContentResponse =
        serde_json::from_str(raw_response).map_err(|e| GeminiError::Schema {
            raw_request: raw_request.to_string(),
            raw_response: raw_response.to_string(),
            message: format!("invalid response envelope: {e}"),
        })?;

    let text = envelope
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .map(|p| p.text.as_str())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| GeminiError::EmptyResponse {
            raw_request: raw_request.to_string(),
            raw_response: raw_response.to_string(),
        })?;

    // The model occasionally wraps the payload in markdown fences despite
    // instructions; strip them before the strict parse.
    let cleaned = text
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();

    serde_json::from_str(&cleaned).map_err(|e| GeminiError::Schema {
        raw_request: raw_request.to_string(),
        raw_response: raw_response.to_string(),
        message: e.to_string(),
    })
}
