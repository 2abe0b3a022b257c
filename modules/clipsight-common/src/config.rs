use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Scrape provider
    pub rocksolid_api_key: String,

    // LLM provider
    pub gemini_api_key: String,
    pub gemini_base_url: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    /// Region hint forwarded to the analysis prompt for trend scoring.
    pub target_region: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            rocksolid_api_key: required_env("ROCKSOLID_API_KEY"),
            gemini_api_key: required_env("GEMINI_API_KEY"),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            target_region: env::var("TARGET_REGION").unwrap_or_else(|_| "Global".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
