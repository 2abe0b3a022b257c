pub mod error;
pub mod types;

pub use error::{Result, RockSolidError};
pub use types::{Media, Owner, ReelData, ReelsPage};

use std::time::Duration;

const BASE_URL: &str = "https://auto-poster.co.uk";

/// Scrape lookups are quick; a stuck call fails fast rather than stalling
/// the single-consumer dispatcher.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RockSolidClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl RockSolidClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch a single reel's public data by shortcode.
    pub async fn get_reel(&self, shortcode: &str) -> Result<ReelData> {
        let url = format!("{}/yt_api/get_media_data_v2.php", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("media_code", shortcode)])
            .header("AP_API_KEY", &self.token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RockSolidError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let reel: ReelData = resp.json().await?;
        tracing::debug!(shortcode, "Fetched reel data");
        Ok(reel)
    }

    /// Fetch one page of an author's recent reels.
    pub async fn get_user_reels(&self, handle: &str, amount: u32) -> Result<ReelsPage> {
        tracing::info!(handle, amount, "Fetching recent reels for author");

        let url = format!("{}/yt_api/get_ig_user_reels.php", self.base_url);
        let form = [
            ("username_or_url", handle.to_string()),
            ("amount", amount.to_string()),
            ("pagination_token", String::new()),
        ];
        let resp = self
            .client
            .post(&url)
            .header("AP_API_KEY", &self.token)
            .form(&form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RockSolidError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let page: ReelsPage = resp.json().await?;
        tracing::info!(handle, count = page.reels.len(), "Fetched recent reels");
        Ok(page)
    }
}
