//! Public entry point for the pipeline: platform classification, content
//! deduplication, anonymous rate limiting, and the enqueue decision.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use clipsight_common::{
    AnalyzeRequest, ClipsightError, JobKind, Post, QueueJob, RequestStatus, SocialPlatform,
    ANON_DAILY_SUBMISSION_LIMIT, ESTIMATE_RENEW_SECS, FRESHNESS_WINDOW_HOURS,
    PENDING_REQUEUE_AFTER_MINUTES,
};

use crate::platform;
use crate::traits::{ContentStore, WorkQueue};

/// Who submitted: an authenticated user id when known, always the source
/// IP. Authentication itself happens upstream.
#[derive(Debug, Clone)]
pub struct Submitter {
    pub user_id: Option<Uuid>,
    pub ip: IpAddr,
}

/// What the client polls with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTicket {
    pub tracking_id: Uuid,
    pub estimated_seconds: u32,
}

pub struct IngestGate {
    store: Arc<dyn ContentStore>,
    queue: Arc<dyn WorkQueue>,
}

impl IngestGate {
    pub fn new(store: Arc<dyn ContentStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    /// Accept or reject a submission. Synchronous rejections return a
    /// typed error; accepted submissions always return a tracking ticket,
    /// even if processing later fails.
    pub async fn submit(
        &self,
        url: &str,
        submitter: &Submitter,
    ) -> Result<QueueTicket, ClipsightError> {
        let link = platform::canonical_url(url);
        let platform = platform::detect_platform(&link);

        if platform != SocialPlatform::Instagram {
            return Err(ClipsightError::InvalidArgument(
                "unsupported platform, we only support Instagram reels for now".to_string(),
            ));
        }

        let shortcode = platform::instagram_shortcode(&link).ok_or_else(|| {
            ClipsightError::InvalidArgument("could not derive a content id from the URL".to_string())
        })?;

        let now = Utc::now();
        let post = self.store.find_post(&shortcode).await?;

        // Anonymous ceiling, checked before any write. Known content and
        // known users are exempt.
        if post.is_none() && submitter.user_id.is_none() {
            let submitted_today = self
                .store
                .count_requests_by_ip_on_day(&submitter.ip.to_string(), now)
                .await?;
            if submitted_today >= ANON_DAILY_SUBMISSION_LIMIT {
                return Err(ClipsightError::PermissionDenied(
                    "daily submission limit reached".to_string(),
                ));
            }
        }

        // Reuse the submitter's existing request for this content instead
        // of creating a duplicate.
        let prior = match &post {
            Some(p) => self.store.list_requests_for_post(&p.id).await?,
            None => self.store.list_requests_for_link(&link).await?,
        };
        let existing = prior.into_iter().find(|r| self.matches_submitter(r, submitter));
        let reused = existing.is_some();

        let mut request = existing.unwrap_or_else(|| AnalyzeRequest {
            id: Uuid::new_v4(),
            user_id: submitter.user_id,
            user_ip: submitter.ip.to_string(),
            link: link.clone(),
            post_id: None,
            status: RequestStatus::Pending,
            fail_reason: None,
            llm_request: None,
            llm_response: None,
            created_at: now,
            updated_at: now,
        });

        // The post row is created eagerly so repeated submissions of the
        // same content converge on one row.
        let post = match post {
            Some(p) => p,
            None => {
                let p = Post {
                    id: shortcode.clone(),
                    channel_id: None,
                    link: link.clone(),
                    image_url: None,
                    video_url: None,
                    author_handle: String::new(),
                    author_name: String::new(),
                    author_profile_url: String::new(),
                    status: RequestStatus::Pending,
                    fail_reason: None,
                    like_count: 0,
                    comment_count: 0,
                    video_view_count: 0,
                    video_play_count: 0,
                    posted_at: None,
                    created_at: now,
                    updated_at: now,
                };
                self.store.upsert_post(&p).await?;
                p
            }
        };
        request.post_id = Some(post.id.clone());

        // Completed content: serve fresh results from the store, renew
        // stale ones with a lightweight re-score job. The tracking record
        // inherits the content's completed state so the poller reads the
        // cached result.
        if post.status == RequestStatus::Completed {
            let freshness_floor = now - Duration::hours(FRESHNESS_WINDOW_HOURS);
            request.status = RequestStatus::Completed;
            request.fail_reason = None;
            self.store.upsert_request(&request).await?;

            if post.updated_at > freshness_floor {
                return Ok(QueueTicket {
                    tracking_id: request.id,
                    estimated_seconds: 0,
                });
            }

            self.enqueue_or_fail(&mut request, JobKind::Renew, &post.id, &link, platform)
                .await?;
            info!(post_id = %post.id, "Enqueued renew job for stale post");
            return Ok(QueueTicket {
                tracking_id: request.id,
                estimated_seconds: ESTIMATE_RENEW_SECS,
            });
        }

        // In-flight work: hand back the same ticket without a second job.
        // A pending request that has sat untouched past the recovery
        // threshold lost its queue message and is re-enqueued.
        let estimated_seconds = platform.estimated_seconds();
        if reused {
            let stuck_floor = now - Duration::minutes(PENDING_REQUEUE_AFTER_MINUTES);
            match request.status {
                RequestStatus::Processing => {
                    return Ok(QueueTicket {
                        tracking_id: request.id,
                        estimated_seconds,
                    });
                }
                RequestStatus::Pending if request.updated_at > stuck_floor => {
                    return Ok(QueueTicket {
                        tracking_id: request.id,
                        estimated_seconds,
                    });
                }
                RequestStatus::Pending => {
                    warn!(request_id = %request.id, "Re-enqueueing stuck pending request");
                }
                // Failed (or a completed request whose post was re-run and
                // failed): explicit re-queue.
                _ => request.status = RequestStatus::Pending,
            }
        }

        self.store.upsert_request(&request).await?;
        self.enqueue_or_fail(&mut request, JobKind::Fresh, &post.id, &link, platform)
            .await?;

        info!(
            request_id = %request.id,
            post_id = %post.id,
            "Enqueued fresh analysis job"
        );

        Ok(QueueTicket {
            tracking_id: request.id,
            estimated_seconds,
        })
    }

    fn matches_submitter(&self, request: &AnalyzeRequest, submitter: &Submitter) -> bool {
        match submitter.user_id {
            Some(user_id) => request.user_id == Some(user_id),
            None => request.user_id.is_none() && request.user_ip == submitter.ip.to_string(),
        }
    }

    /// Enqueue after the tracking record exists. A queue failure is
    /// recorded on the request so an accepted submission is never silently
    /// lost.
    async fn enqueue_or_fail(
        &self,
        request: &mut AnalyzeRequest,
        kind: JobKind,
        post_id: &str,
        link: &str,
        platform: SocialPlatform,
    ) -> Result<(), ClipsightError> {
        let job = QueueJob {
            request_id: request.id,
            post_id: Some(post_id.to_string()),
            url: link.to_string(),
            platform,
        };

        if let Err(e) = self.queue.enqueue(kind, &job).await {
            request.status = RequestStatus::Failed;
            request.fail_reason = Some(format!("failed to enqueue analysis job: {e:#}"));
            if let Err(persist) = self.store.upsert_request(request).await {
                warn!(error = %persist, "Failed to record enqueue failure");
            }
            return Err(ClipsightError::Internal(format!(
                "failed to enqueue analysis job: {e:#}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use clipsight_common::ESTIMATE_SHORT_FORM_SECS;

    fn gate(store: Arc<MockStore>, queue: Arc<MockQueue>) -> IngestGate {
        IngestGate::new(store, queue)
    }

    fn anon(ip: &str) -> Submitter {
        Submitter {
            user_id: None,
            ip: ip.parse().unwrap(),
        }
    }

    const REEL_URL: &str = "https://www.instagram.com/reel/Cxyz_12-Ab";

    #[tokio::test]
    async fn rejects_unsupported_platforms() {
        let store = Arc::new(MockStore::new());
        let g = gate(store, Arc::new(MockQueue::new()));

        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.tiktok.com/@user/video/7301234567890123456",
            "https://x.com/user/status/1790000000000000000",
            "https://example.com/some/page",
        ] {
            let err = g.submit(url, &anon("10.0.0.1")).await.unwrap_err();
            assert!(
                matches!(err, ClipsightError::InvalidArgument(_)),
                "{url} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn accepts_reel_and_enqueues_fresh_job() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new());
        let g = gate(store.clone(), queue.clone());

        let ticket = g.submit(REEL_URL, &anon("10.0.0.1")).await.unwrap();
        assert_eq!(ticket.estimated_seconds, ESTIMATE_SHORT_FORM_SECS);

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        let (kind, job) = &jobs[0];
        assert_eq!(*kind, JobKind::Fresh);
        assert_eq!(job.post_id.as_deref(), Some("Cxyz_12-Ab"));
        assert_eq!(job.request_id, ticket.tracking_id);

        // Post row created eagerly, pending.
        let post = store.post("Cxyz_12-Ab").unwrap();
        assert_eq!(post.status, RequestStatus::Pending);
        assert_eq!(post.link, "https://www.instagram.com/reel/Cxyz_12-Ab");
    }

    #[tokio::test]
    async fn duplicate_submission_reuses_ticket_without_second_job() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new());
        let g = gate(store, queue.clone());

        let first = g.submit(REEL_URL, &anon("10.0.0.1")).await.unwrap();
        // Same content with tracking params must converge on the same id.
        let second = g
            .submit(&format!("{REEL_URL}/?utm_source=share"), &anon("10.0.0.1"))
            .await
            .unwrap();

        assert_eq!(first.tracking_id, second.tracking_id);
        assert_eq!(queue.jobs().len(), 1);
    }

    #[tokio::test]
    async fn different_submitters_get_distinct_tickets_for_same_content() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new());
        let g = gate(store, queue.clone());

        let a = g.submit(REEL_URL, &anon("10.0.0.1")).await.unwrap();
        let b = g.submit(REEL_URL, &anon("10.0.0.2")).await.unwrap();
        assert_ne!(a.tracking_id, b.tracking_id);
    }

    #[tokio::test]
    async fn third_anonymous_submission_same_day_is_denied() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new());
        let g = gate(store, queue);

        let submitter = anon("10.0.0.1");
        g.submit("https://instagram.com/reel/AAA111", &submitter)
            .await
            .expect("first submission should pass");
        g.submit("https://instagram.com/reel/BBB222", &submitter)
            .await
            .expect("second submission should pass");

        let err = g
            .submit("https://instagram.com/reel/CCC333", &submitter)
            .await
            .unwrap_err();
        assert!(matches!(err, ClipsightError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn rate_limit_skips_authenticated_users_and_known_content() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new());
        let g = gate(store.clone(), queue);

        let user = Submitter {
            user_id: Some(Uuid::new_v4()),
            ip: "10.0.0.1".parse().unwrap(),
        };
        for code in ["AAA111", "BBB222", "CCC333"] {
            g.submit(&format!("https://instagram.com/reel/{code}"), &user)
                .await
                .expect("authenticated submissions are not capped");
        }

        // An anonymous resubmission of already-known content is exempt too.
        let anon_sub = anon("10.0.0.1");
        g.submit("https://instagram.com/reel/AAA111", &anon_sub)
            .await
            .expect("known content bypasses the ceiling");
    }

    #[tokio::test]
    async fn completed_fresh_post_returns_immediately() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new());

        let mut post = test_post("Cxyz_12-Ab");
        post.status = RequestStatus::Completed;
        // Just inside the freshness window (margin covers test runtime).
        post.updated_at = Utc::now() - Duration::hours(FRESHNESS_WINDOW_HOURS)
            + Duration::milliseconds(250);
        store.insert_post(post);

        let mut request = test_request(REEL_URL, "10.0.0.1");
        request.post_id = Some("Cxyz_12-Ab".to_string());
        request.status = RequestStatus::Completed;
        let request_id = request.id;
        store.insert_request(request);

        let g = gate(store, queue.clone());
        let ticket = g.submit(REEL_URL, &anon("10.0.0.1")).await.unwrap();

        assert_eq!(ticket.tracking_id, request_id);
        assert_eq!(ticket.estimated_seconds, 0);
        assert!(queue.jobs().is_empty(), "fresh post must not enqueue");
    }

    #[tokio::test]
    async fn new_submitter_of_completed_content_gets_cached_result() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new());

        let mut post = test_post("Cxyz_12-Ab");
        post.status = RequestStatus::Completed;
        post.updated_at = Utc::now();
        store.insert_post(post);

        let g = gate(store.clone(), queue.clone());
        let ticket = g.submit(REEL_URL, &anon("10.0.0.9")).await.unwrap();

        assert_eq!(ticket.estimated_seconds, 0);
        assert!(queue.jobs().is_empty());
        // The new tracking record reads as completed for the poller.
        assert_eq!(
            store.request(ticket.tracking_id).unwrap().status,
            RequestStatus::Completed
        );
    }

    #[tokio::test]
    async fn stale_completed_post_enqueues_renew() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new());

        let mut post = test_post("Cxyz_12-Ab");
        post.status = RequestStatus::Completed;
        // 1 s past the freshness window.
        post.updated_at =
            Utc::now() - Duration::hours(FRESHNESS_WINDOW_HOURS) - Duration::seconds(1);
        store.insert_post(post);

        let mut request = test_request(REEL_URL, "10.0.0.1");
        request.post_id = Some("Cxyz_12-Ab".to_string());
        request.status = RequestStatus::Completed;
        store.insert_request(request);

        let g = gate(store, queue.clone());
        let ticket = g.submit(REEL_URL, &anon("10.0.0.1")).await.unwrap();

        assert_eq!(ticket.estimated_seconds, ESTIMATE_RENEW_SECS);
        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].0, JobKind::Renew);
    }

    #[tokio::test]
    async fn failed_request_is_requeued_on_resubmission() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new());

        store.insert_post(test_post("Cxyz_12-Ab"));
        let mut request = test_request(REEL_URL, "10.0.0.1");
        request.post_id = Some("Cxyz_12-Ab".to_string());
        request.status = RequestStatus::Failed;
        request.fail_reason = Some("scrape failed".to_string());
        let request_id = request.id;
        store.insert_request(request);

        let g = gate(store.clone(), queue.clone());
        let ticket = g.submit(REEL_URL, &anon("10.0.0.1")).await.unwrap();

        assert_eq!(ticket.tracking_id, request_id);
        assert_eq!(queue.jobs().len(), 1);
        assert_eq!(
            store.request(request_id).unwrap().status,
            RequestStatus::Pending
        );
    }

    #[tokio::test]
    async fn stuck_pending_request_is_recovered() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new());

        store.insert_post(test_post("Cxyz_12-Ab"));
        let mut request = test_request(REEL_URL, "10.0.0.1");
        request.post_id = Some("Cxyz_12-Ab".to_string());
        request.updated_at = Utc::now() - Duration::minutes(PENDING_REQUEUE_AFTER_MINUTES + 1);
        store.insert_request(request);

        let g = gate(store, queue.clone());
        g.submit(REEL_URL, &anon("10.0.0.1")).await.unwrap();
        assert_eq!(queue.jobs().len(), 1, "lost job should be re-enqueued");
    }

    #[tokio::test]
    async fn enqueue_failure_is_recorded_not_silent() {
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(MockQueue::new().failing());
        let g = gate(store.clone(), queue);

        let err = g.submit(REEL_URL, &anon("10.0.0.1")).await.unwrap_err();
        assert!(matches!(err, ClipsightError::Internal(_)));

        let requests = store.requests_for_link(REEL_URL);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].status, RequestStatus::Failed);
        assert!(requests[0]
            .fail_reason
            .as_deref()
            .unwrap()
            .contains("enqueue"));
    }
}
