use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use clipsight_common::{AnalysisCaptions, AnalysisMetric, PostAnalysis};

use crate::error::{Result, StoreError};
use crate::PgStore;

#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: Uuid,
    post_id: String,
    viral_score: f64,
    big_idea: String,
    why_viral: String,
    audience_sentiment: String,
    sentiment_score: i32,
    scope: String,
    scope_confidence: i32,
    metrics: serde_json::Value,
    strengths: serde_json::Value,
    weaknesses: serde_json::Value,
    hook_ideas: serde_json::Value,
    script_ideas: serde_json::Value,
    captions: serde_json::Value,
    hashtags: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn decode<T: serde::de::DeserializeOwned>(field: &str, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt(format!("{field}: {e}")))
}

fn encode<T: serde::Serialize>(field: &str, value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(format!("{field}: {e}")))
}

impl AnalysisRow {
    fn into_analysis(self) -> Result<PostAnalysis> {
        Ok(PostAnalysis {
            id: self.id,
            post_id: self.post_id,
            viral_score: self.viral_score,
            big_idea: self.big_idea,
            why_viral: self.why_viral,
            audience_sentiment: self.audience_sentiment,
            sentiment_score: self.sentiment_score,
            scope: self.scope,
            scope_confidence: self.scope_confidence,
            metrics: decode::<Vec<AnalysisMetric>>("metrics", self.metrics)?,
            strengths: decode("strengths", self.strengths)?,
            weaknesses: decode("weaknesses", self.weaknesses)?,
            hook_ideas: decode("hook_ideas", self.hook_ideas)?,
            script_ideas: decode("script_ideas", self.script_ideas)?,
            captions: decode::<AnalysisCaptions>("captions", self.captions)?,
            hashtags: decode("hashtags", self.hashtags)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgStore {
    /// Write the verdict for a post in one statement; a re-run overwrites
    /// the previous verdict atomically.
    pub async fn upsert_post_analysis(&self, analysis: &PostAnalysis) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO post_analyses
                (id, post_id, viral_score, big_idea, why_viral, audience_sentiment,
                 sentiment_score, scope, scope_confidence,
                 metrics, strengths, weaknesses, hook_ideas, script_ideas,
                 captions, hashtags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (post_id) DO UPDATE SET
                viral_score = EXCLUDED.viral_score,
                big_idea = EXCLUDED.big_idea,
                why_viral = EXCLUDED.why_viral,
                audience_sentiment = EXCLUDED.audience_sentiment,
                sentiment_score = EXCLUDED.sentiment_score,
                scope = EXCLUDED.scope,
                scope_confidence = EXCLUDED.scope_confidence,
                metrics = EXCLUDED.metrics,
                strengths = EXCLUDED.strengths,
                weaknesses = EXCLUDED.weaknesses,
                hook_ideas = EXCLUDED.hook_ideas,
                script_ideas = EXCLUDED.script_ideas,
                captions = EXCLUDED.captions,
                hashtags = EXCLUDED.hashtags,
                updated_at = now()
            "#,
        )
        .bind(analysis.id)
        .bind(&analysis.post_id)
        .bind(analysis.viral_score)
        .bind(&analysis.big_idea)
        .bind(&analysis.why_viral)
        .bind(&analysis.audience_sentiment)
        .bind(analysis.sentiment_score)
        .bind(&analysis.scope)
        .bind(analysis.scope_confidence)
        .bind(encode("metrics", &analysis.metrics)?)
        .bind(encode("strengths", &analysis.strengths)?)
        .bind(encode("weaknesses", &analysis.weaknesses)?)
        .bind(encode("hook_ideas", &analysis.hook_ideas)?)
        .bind(encode("script_ideas", &analysis.script_ideas)?)
        .bind(encode("captions", &analysis.captions)?)
        .bind(encode("hashtags", &analysis.hashtags)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_post_analysis(&self, post_id: &str) -> Result<Option<PostAnalysis>> {
        let row = sqlx::query_as::<_, AnalysisRow>("SELECT * FROM post_analyses WHERE post_id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AnalysisRow::into_analysis).transpose()
    }
}
