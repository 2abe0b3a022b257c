//! Single logical consumer draining the work queue. Each popped job runs
//! to success or failure before the next pop; there is no internal
//! parallelism and no automatic retry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use clipsight_common::{
    AnalyzeRequest, JobKind, Post, QueueJob, RequestStatus, SocialPlatform,
};

use crate::analysis::AnalysisOrchestrator;
use crate::normalize::{self, ContentNormalizer};
use crate::platform;
use crate::scoring;
use crate::scrape::ScrapeOrchestrator;
use crate::traits::{ContentStore, WorkQueue};

/// How long to sleep when both queues are empty.
const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct QueueDispatcher {
    store: Arc<dyn ContentStore>,
    queue: Arc<dyn WorkQueue>,
    scraper: ScrapeOrchestrator,
    analyzer: AnalysisOrchestrator,
    normalizer: ContentNormalizer,
}

impl QueueDispatcher {
    pub fn new(
        store: Arc<dyn ContentStore>,
        queue: Arc<dyn WorkQueue>,
        scraper: ScrapeOrchestrator,
        analyzer: AnalysisOrchestrator,
        normalizer: ContentNormalizer,
    ) -> Self {
        Self {
            store,
            queue,
            scraper,
            analyzer,
            normalizer,
        }
    }

    /// Block on the queue forever. Per-job failures are recorded on the
    /// request and never crash the loop.
    pub async fn run(&self) {
        info!("Queue dispatcher running in background");
        loop {
            match self.queue.pop().await {
                Ok(Some((kind, job))) => {
                    if let Err(e) = self.process(kind, &job).await {
                        error!(request_id = %job.request_id, error = %format!("{e:#}"), "Job processing failed");
                    }
                }
                Ok(None) => tokio::time::sleep(IDLE_POLL_INTERVAL).await,
                Err(e) => {
                    error!(error = %format!("{e:#}"), "Queue pop failed");
                    tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                }
            }
        }
    }

    /// Process one job to completion. Delivery is at-most-once from this
    /// side: a job that fails is marked failed and dropped, not retried.
    pub async fn process(&self, kind: JobKind, job: &QueueJob) -> Result<()> {
        let Some(mut request) = self.store.find_request(job.request_id).await? else {
            warn!(request_id = %job.request_id, "Dropping job for unknown request");
            return Ok(());
        };

        let post_id = match job
            .post_id
            .clone()
            .or_else(|| platform::instagram_shortcode(&job.url))
        {
            Some(id) => id,
            None => {
                self.fail_request(&mut request, "job payload has no content id".to_string())
                    .await;
                return Ok(());
            }
        };

        let Some(mut post) = self.store.find_post(&post_id).await? else {
            self.fail_request(&mut request, format!("post {post_id} not found"))
                .await;
            return Ok(());
        };

        request.status = RequestStatus::Processing;
        self.store.upsert_request(&request).await?;

        match job.platform {
            SocialPlatform::Instagram => match kind {
                JobKind::Fresh => self.process_fresh(&mut request, &mut post).await,
                JobKind::Renew => self.process_renew(&mut request, &mut post).await,
            },
            other => {
                // Recognized at the gate but not supported end-to-end;
                // a job for it can only come from an old or foreign queue.
                warn!(platform = %other, "Dropping job for unsupported platform");
                self.fail(&mut request, &mut post, format!("unsupported platform {other}"))
                    .await;
                Ok(())
            }
        }
    }

    /// The full pipeline: scrape primary → scrape peers → analyze →
    /// normalize + persist. Partial writes are kept on failure; the job is
    /// only forward-marked as failed.
    async fn process_fresh(&self, request: &mut AnalyzeRequest, post: &mut Post) -> Result<()> {
        info!(post_id = %post.id, "Processing fresh analysis job");

        let outcome = match self.scraper.fetch_and_update(post).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.fail(request, post, format!("scrape failed: {e:#}")).await;
                return Ok(());
            }
        };

        if let Some(ref peer_error) = outcome.peer_error {
            warn!(post_id = %post.id, error = %peer_error, "Analyzing without channel averages");
        }

        let analyzed = self
            .analyzer
            .analyze(post, &outcome.reel, outcome.channel_history.as_ref())
            .await;

        let analyzed = match analyzed {
            Ok(a) => {
                request.llm_request = Some(a.raw_request.clone());
                request.llm_response = Some(a.raw_response.clone());
                a
            }
            Err(failure) => {
                request.llm_request = failure.raw_request;
                request.llm_response = failure.raw_response;
                self.fail(request, post, failure.reason).await;
                return Ok(());
            }
        };

        let run = match self.normalizer.normalize(post, &outcome.reel, &analyzed.analysis) {
            Ok(run) => run,
            Err(e) => {
                self.fail(request, post, format!("normalization failed: {e}"))
                    .await;
                return Ok(());
            }
        };

        // All-or-nothing: a post must never read completed with no
        // content behind it.
        if let Err(e) = self
            .store
            .replace_post_contents(&post.id, &run.contents)
            .await
        {
            self.fail(request, post, format!("persisting content failed: {e:#}"))
                .await;
            return Ok(());
        }
        if let Err(e) = self.store.upsert_post_analysis(&run.analysis).await {
            self.fail(request, post, format!("persisting analysis failed: {e:#}"))
                .await;
            return Ok(());
        }

        self.complete(request, post).await;
        info!(
            post_id = %post.id,
            contents = run.contents.len(),
            viral_score = run.analysis.viral_score,
            "Fresh analysis complete"
        );
        Ok(())
    }

    /// Stats refresh + re-score. No LLM call, no content-row changes.
    async fn process_renew(&self, request: &mut AnalyzeRequest, post: &mut Post) -> Result<()> {
        info!(post_id = %post.id, "Processing renew job");

        if let Err(e) = self.scraper.fetch_and_update(post).await {
            self.fail(request, post, format!("stats refresh failed: {e:#}"))
                .await;
            return Ok(());
        }

        let Some(mut analysis) = self.store.find_post_analysis(&post.id).await? else {
            self.fail(
                request,
                post,
                "no prior analysis to renew".to_string(),
            )
            .await;
            return Ok(());
        };

        let metrics = normalize::extract_stored_metrics(&analysis.metrics);
        analysis.viral_score =
            scoring::viral_score(metrics, analysis.scope_confidence, &analysis.scope);

        if let Err(e) = self.store.upsert_post_analysis(&analysis).await {
            self.fail(request, post, format!("persisting analysis failed: {e:#}"))
                .await;
            return Ok(());
        }

        self.complete(request, post).await;
        info!(post_id = %post.id, viral_score = analysis.viral_score, "Renew complete");
        Ok(())
    }

    async fn complete(&self, request: &mut AnalyzeRequest, post: &mut Post) {
        post.status = RequestStatus::Completed;
        post.fail_reason = None;
        request.status = RequestStatus::Completed;
        request.fail_reason = None;
        self.persist_state(request, post).await;
    }

    async fn fail(&self, request: &mut AnalyzeRequest, post: &mut Post, reason: String) {
        warn!(post_id = %post.id, reason = %reason, "Marking job failed");
        post.status = RequestStatus::Failed;
        post.fail_reason = Some(reason.clone());
        request.status = RequestStatus::Failed;
        request.fail_reason = Some(reason);
        self.persist_state(request, post).await;
    }

    async fn fail_request(&self, request: &mut AnalyzeRequest, reason: String) {
        warn!(request_id = %request.id, reason = %reason, "Marking request failed");
        request.status = RequestStatus::Failed;
        request.fail_reason = Some(reason);
        if let Err(e) = self.store.upsert_request(request).await {
            error!(error = %format!("{e:#}"), "Failed to persist request state");
        }
    }

    /// Status writes are best-effort: an unreachable store here cannot be
    /// recorded anywhere else anyway, so log and move on.
    async fn persist_state(&self, request: &AnalyzeRequest, post: &Post) {
        if let Err(e) = self.store.upsert_post(post).await {
            error!(error = %format!("{e:#}"), "Failed to persist post state");
        }
        if let Err(e) = self.store.upsert_request(request).await {
            error!(error = %format!("{e:#}"), "Failed to persist request state");
        }
    }
}
