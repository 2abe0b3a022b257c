//! REST handlers: submit a post URL for analysis, poll the result.

use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use clipsight_common::{
    AnalyzeRequest, ChannelHistory, ClipsightError, ContentKind, ContentMetadata, Post,
    PostAnalysis, RequestStatus,
};
use clipsight_engine::Submitter;

use crate::AppState;

#[derive(Deserialize)]
pub struct SubmitRequest {
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    request_id: Uuid,
    estimated_time: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentFragment {
    content: String,
    language: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentFragment {
    #[serde(flatten)]
    fragment: ContentFragment,
    timestamp: String,
    speaker: String,
    emotion: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResult {
    platform: &'static str,
    status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    fail_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_url: Option<String>,
    like_count: i64,
    comment_count: i64,
    view_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    engagement_rate: Option<f64>,
    average_like_count: i64,
    average_comment_count: i64,
    average_view_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    average_engagement_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<ContentFragment>,
    segments: Vec<SegmentFragment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<PostAnalysis>,
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<SubmitRequest>,
) -> Response {
    // Authentication is upstream; a verified user id arrives as a header.
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok());

    let submitter = Submitter {
        user_id,
        ip: addr.ip(),
    };

    match state.gate.submit(&body.url, &submitter).await {
        Ok(ticket) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                request_id: ticket.tracking_id,
                estimated_time: ticket.estimated_seconds,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn result(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match build_result(&state, id).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(e),
    }
}

async fn build_result(state: &AppState, id: Uuid) -> Result<AnalyzeResult, ClipsightError> {
    let request = state
        .store
        .find_request(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ClipsightError::NotFound(format!("unknown tracking id {id}")))?;

    // In-flight and failed requests report status only; the stored failure
    // reason is surfaced verbatim.
    if request.status != RequestStatus::Completed {
        return Ok(status_only(&request));
    }

    let Some(post_id) = request.post_id.as_deref() else {
        return Ok(status_only(&request));
    };
    let Some(post) = state.store.find_post(post_id).await.map_err(internal)? else {
        return Ok(status_only(&request));
    };

    let history = match post.channel_id {
        Some(channel_id) => state
            .store
            .latest_channel_history(channel_id)
            .await
            .map_err(internal)?,
        None => None,
    };

    let contents = state
        .store
        .list_post_contents(&post.id)
        .await
        .map_err(internal)?;
    let analysis = state
        .store
        .find_post_analysis(&post.id)
        .await
        .map_err(internal)?;

    let mut caption = None;
    let mut segments = Vec::new();
    for content in contents {
        match content.kind {
            ContentKind::Caption => {
                caption = Some(ContentFragment {
                    content: content.text,
                    language: content.language,
                });
            }
            ContentKind::Transcript => {
                let (timestamp, speaker, emotion) = match content.metadata {
                    Some(ContentMetadata::Segment {
                        timestamp,
                        speaker,
                        emotion,
                    }) => (timestamp, speaker, emotion),
                    _ => Default::default(),
                };
                segments.push(SegmentFragment {
                    fragment: ContentFragment {
                        content: content.text,
                        language: content.language,
                    },
                    timestamp,
                    speaker,
                    emotion,
                });
            }
            _ => {}
        }
    }

    Ok(completed_result(&post, history.as_ref(), caption, segments, analysis))
}

fn status_only(request: &AnalyzeRequest) -> AnalyzeResult {
    AnalyzeResult {
        platform: "instagram",
        status: request.status,
        fail_reason: request.fail_reason.clone(),
        user_link: None,
        user_handle: None,
        image_url: None,
        video_url: None,
        like_count: 0,
        comment_count: 0,
        view_count: 0,
        post_date: None,
        engagement_rate: None,
        average_like_count: 0,
        average_comment_count: 0,
        average_view_count: 0,
        average_engagement_rate: None,
        caption: None,
        segments: Vec::new(),
        analysis: None,
    }
}

fn completed_result(
    post: &Post,
    history: Option<&ChannelHistory>,
    caption: Option<ContentFragment>,
    segments: Vec<SegmentFragment>,
    analysis: Option<PostAnalysis>,
) -> AnalyzeResult {
    let followers = history.map(|h| h.followers_count).unwrap_or(0);

    AnalyzeResult {
        platform: "instagram",
        status: RequestStatus::Completed,
        fail_reason: None,
        user_link: Some(post.author_profile_url.clone()),
        user_handle: Some(post.author_handle.clone()),
        image_url: post.image_url.clone(),
        video_url: post.video_url.clone(),
        like_count: post.like_count,
        comment_count: post.comment_count,
        view_count: post.video_play_count,
        post_date: post.posted_at,
        engagement_rate: engagement_rate(post.like_count + post.comment_count, followers),
        average_like_count: history.map(|h| h.average_likes).unwrap_or(0),
        average_comment_count: history.map(|h| h.average_comments).unwrap_or(0),
        average_view_count: history.map(|h| h.average_video_plays).unwrap_or(0),
        average_engagement_rate: history.and_then(|h| {
            engagement_rate(h.average_likes + h.average_comments, h.followers_count)
        }),
        caption,
        segments,
        analysis,
    }
}

/// Rate is unavailable, not zero or infinite, when followers are unknown.
fn engagement_rate(interactions: i64, followers: i64) -> Option<f64> {
    if followers <= 0 {
        return None;
    }
    Some(interactions as f64 / followers as f64 * 100.0)
}

fn internal<E: std::fmt::Display>(e: E) -> ClipsightError {
    ClipsightError::Internal(e.to_string())
}

fn error_response(err: ClipsightError) -> Response {
    let status = match &err {
        ClipsightError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ClipsightError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        ClipsightError::NotFound(_) => StatusCode::NOT_FOUND,
        ClipsightError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!(error = %err, "Request failed");
    }
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engagement_rate_guards_division_by_zero() {
        assert_eq!(engagement_rate(4510, 0), None);
        assert_eq!(engagement_rate(4510, -5), None);
        let rate = engagement_rate(4510, 120_000).unwrap();
        assert!((rate - 3.758_333_333).abs() < 1e-6);
        assert!(rate.is_finite());
    }
}
