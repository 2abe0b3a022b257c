use std::time::Duration;

use serde_json::Value;
use tracing::debug;

/// Video analysis routinely takes tens of seconds; the deadline bounds the
/// worst case without giving up on normal long calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Plain transport failure, before any schema concerns.
pub(crate) enum HttpFailure {
    Network(String),
    Status { status: u16, body: String },
}

pub(crate) struct GeminiHttp {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl GeminiHttp {
    pub(crate) fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// POST a generateContent request and return the raw body text.
    pub(crate) async fn generate(&self, model: &str, body: &Value) -> Result<String, HttpFailure> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        debug!(model, "Gemini generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| HttpFailure::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HttpFailure::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(HttpFailure::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}
