//! End-to-end pipeline tests: mock collaborators, real dispatcher, real
//! orchestrators. MOCK → PROCESS → ASSERT on stored state.

use std::sync::Arc;

use uuid::Uuid;

use clipsight_common::{
    ContentKind, JobKind, PeerReelStats, QueueJob, RequestStatus, SocialPlatform,
};
use clipsight_engine::normalize::extract_stored_metrics;
use clipsight_engine::scoring;
use clipsight_engine::testing::*;
use clipsight_engine::{
    AnalysisOrchestrator, ContentNormalizer, QueueDispatcher, ScrapeOrchestrator,
};
use gemini_client::GeminiError;

const SHORTCODE: &str = "Cxyz_12-Ab";
const REEL_URL: &str = "https://www.instagram.com/reel/Cxyz_12-Ab";

struct Harness {
    store: Arc<MockStore>,
    queue: Arc<MockQueue>,
    analyst: Arc<MockAnalyst>,
    dispatcher: QueueDispatcher,
}

fn harness(source: MockReelSource, analyst: MockAnalyst) -> Harness {
    let store = Arc::new(MockStore::new());
    harness_with_store(store, source, analyst)
}

fn harness_with_store(
    store: Arc<MockStore>,
    source: MockReelSource,
    analyst: MockAnalyst,
) -> Harness {
    let queue = Arc::new(MockQueue::new());
    let source = Arc::new(source);
    let analyst = Arc::new(analyst);
    let detector = Arc::new(FixedDetector::new().with_default("en"));

    let dispatcher = QueueDispatcher::new(
        store.clone(),
        queue.clone(),
        ScrapeOrchestrator::new(source, store.clone()),
        AnalysisOrchestrator::new(analyst.clone(), detector.clone(), "Global"),
        ContentNormalizer::new(detector),
    );

    Harness {
        store,
        queue,
        analyst,
        dispatcher,
    }
}

fn seeded_job(store: &MockStore) -> QueueJob {
    let post = test_post(SHORTCODE);
    let mut request = test_request(REEL_URL, "10.0.0.1");
    request.post_id = Some(post.id.clone());
    let request_id = request.id;
    store.insert_post(post);
    store.insert_request(request);

    QueueJob {
        request_id,
        post_id: Some(SHORTCODE.to_string()),
        url: REEL_URL.to_string(),
        platform: SocialPlatform::Instagram,
    }
}

fn working_source() -> MockReelSource {
    MockReelSource::new()
        .on_reel(SHORTCODE, test_reel(SHORTCODE, "editlab"))
        .on_recent(
            "editlab",
            vec![
                PeerReelStats {
                    like_count: 2000,
                    comment_count: 100,
                    video_view_count: 30_000,
                    video_play_count: 40_000,
                },
                PeerReelStats {
                    like_count: 4000,
                    comment_count: 200,
                    video_view_count: 50_000,
                    video_play_count: 70_000,
                },
            ],
        )
}

#[tokio::test]
async fn fresh_job_runs_the_whole_pipeline() {
    let h = harness(working_source(), MockAnalyst::new().with_response(test_analysis()));
    let job = seeded_job(&h.store);

    h.dispatcher.process(JobKind::Fresh, &job).await.unwrap();

    let request = h.store.request(job.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Completed);
    assert_eq!(request.fail_reason, None);
    assert!(request.llm_request.is_some(), "raw request kept for audit");
    assert!(request.llm_response.is_some(), "raw response kept for audit");

    let post = h.store.post(SHORTCODE).unwrap();
    assert_eq!(post.status, RequestStatus::Completed);
    assert_eq!(post.author_handle, "editlab");
    assert_eq!(post.like_count, 4200);

    let contents = h.store.contents_for(SHORTCODE);
    assert!(contents.iter().any(|c| c.kind == ContentKind::Caption));

    let analysis = h.store.analysis_for(SHORTCODE).unwrap();
    assert!(analysis.viral_score > 0.0);
    assert_eq!(analysis.metrics.len(), 6);

    // One history snapshot appended for the author's channel.
    let channel_id = post.channel_id.unwrap();
    assert_eq!(h.store.history_count(channel_id), 1);
}

#[tokio::test]
async fn scrape_failure_marks_request_and_post_failed() {
    // No reel registered: the primary fetch fails.
    let h = harness(
        MockReelSource::new(),
        MockAnalyst::new().with_response(test_analysis()),
    );
    let job = seeded_job(&h.store);

    h.dispatcher.process(JobKind::Fresh, &job).await.unwrap();

    let request = h.store.request(job.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    let reason = request.fail_reason.unwrap();
    assert!(reason.contains("scrape failed"), "got: {reason}");

    let post = h.store.post(SHORTCODE).unwrap();
    assert_eq!(post.status, RequestStatus::Failed);
    // The stored reason is what the poller will read, verbatim.
    assert_eq!(post.fail_reason.unwrap(), reason);
    assert_eq!(h.analyst.calls(), 0, "analysis must not run after scrape failure");
}

#[tokio::test]
async fn analysis_failure_keeps_audit_trail_and_partial_writes() {
    let h = harness(
        working_source(),
        MockAnalyst::new().with_error(|| GeminiError::Schema {
            raw_request: "outbound".to_string(),
            raw_response: "inbound".to_string(),
            message: "missing field `analysis`".to_string(),
        }),
    );
    let job = seeded_job(&h.store);

    h.dispatcher.process(JobKind::Fresh, &job).await.unwrap();

    let request = h.store.request(job.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert_eq!(request.llm_request.as_deref(), Some("outbound"));
    assert_eq!(request.llm_response.as_deref(), Some("inbound"));

    // Scraped fields committed before the failure are kept, only
    // forward-marked as failed.
    let post = h.store.post(SHORTCODE).unwrap();
    assert_eq!(post.status, RequestStatus::Failed);
    assert_eq!(post.author_handle, "editlab");
    assert_eq!(post.like_count, 4200);
}

#[tokio::test]
async fn content_persistence_failure_fails_the_run() {
    let store = Arc::new(MockStore::new().failing_content_writes());
    let h = harness_with_store(
        store,
        working_source(),
        MockAnalyst::new().with_response(test_analysis()),
    );
    let job = seeded_job(&h.store);

    h.dispatcher.process(JobKind::Fresh, &job).await.unwrap();

    let request = h.store.request(job.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert!(request
        .fail_reason
        .unwrap()
        .contains("persisting content failed"));
    // Never completed-with-no-content.
    assert_eq!(h.store.post(SHORTCODE).unwrap().status, RequestStatus::Failed);
}

#[tokio::test]
async fn renew_rescores_from_stored_metrics_without_llm() {
    let h = harness(working_source(), MockAnalyst::new());
    let job = seeded_job(&h.store);

    // Prior completed run: analysis + contents already stored.
    let reel = test_reel(SHORTCODE, "editlab");
    let detector: Arc<FixedDetector> = Arc::new(FixedDetector::new().with_default("en"));
    let prior = ContentNormalizer::new(detector)
        .normalize(&h.store.post(SHORTCODE).unwrap(), &reel, &test_analysis())
        .unwrap();
    h.store.insert_contents(SHORTCODE, prior.contents.clone());
    let mut analysis = prior.analysis;
    analysis.viral_score = 0.0;
    h.store.insert_analysis(analysis);

    h.dispatcher.process(JobKind::Renew, &job).await.unwrap();

    let request = h.store.request(job.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Completed);
    assert_eq!(h.analyst.calls(), 0, "renew must not invoke the LLM");

    // Score recomputed from the stored metric list.
    let stored = h.store.analysis_for(SHORTCODE).unwrap();
    let expected = scoring::viral_score(
        extract_stored_metrics(&stored.metrics),
        stored.scope_confidence,
        &stored.scope,
    );
    assert_eq!(stored.viral_score, expected);
    assert!(stored.viral_score > 0.0);

    // Content rows untouched by a renew run.
    let contents = h.store.contents_for(SHORTCODE);
    assert_eq!(contents.len(), prior.contents.len());

    // Engagement stats refreshed and a new snapshot appended.
    let post = h.store.post(SHORTCODE).unwrap();
    assert_eq!(post.status, RequestStatus::Completed);
    assert_eq!(post.like_count, 4200);
    assert_eq!(h.store.history_count(post.channel_id.unwrap()), 1);
}

#[tokio::test]
async fn renew_without_prior_analysis_fails() {
    let h = harness(working_source(), MockAnalyst::new());
    let job = seeded_job(&h.store);

    h.dispatcher.process(JobKind::Renew, &job).await.unwrap();

    let request = h.store.request(job.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert!(request.fail_reason.unwrap().contains("no prior analysis"));
}

#[tokio::test]
async fn unknown_request_is_logged_and_dropped() {
    let h = harness(working_source(), MockAnalyst::new());

    let job = QueueJob {
        request_id: Uuid::new_v4(),
        post_id: Some(SHORTCODE.to_string()),
        url: REEL_URL.to_string(),
        platform: SocialPlatform::Instagram,
    };

    // No panic, no stored state.
    h.dispatcher.process(JobKind::Fresh, &job).await.unwrap();
    assert!(h.store.post(SHORTCODE).is_none());
}

#[tokio::test]
async fn unsupported_platform_job_is_failed_and_dropped() {
    let h = harness(working_source(), MockAnalyst::new());
    let mut job = seeded_job(&h.store);
    job.platform = SocialPlatform::YouTube;

    h.dispatcher.process(JobKind::Fresh, &job).await.unwrap();

    let request = h.store.request(job.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert!(request.fail_reason.unwrap().contains("unsupported platform"));
    assert_eq!(h.analyst.calls(), 0);
}

#[tokio::test]
async fn peer_failure_still_completes_without_baseline() {
    // Recent reels unregistered: the peer sample fails, the pipeline
    // proceeds without channel averages.
    let source = MockReelSource::new().on_reel(SHORTCODE, test_reel(SHORTCODE, "editlab"));
    let h = harness(source, MockAnalyst::new().with_response(test_analysis()));
    let job = seeded_job(&h.store);

    h.dispatcher.process(JobKind::Fresh, &job).await.unwrap();

    let request = h.store.request(job.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Completed);

    let seen = h.analyst.last_request().unwrap();
    assert!(seen.average_stats.is_empty(), "no misleading baseline");
}

#[tokio::test]
async fn queue_drains_fresh_before_renew() {
    let queue = MockQueue::new();
    let fresh = QueueJob {
        request_id: Uuid::new_v4(),
        post_id: None,
        url: REEL_URL.to_string(),
        platform: SocialPlatform::Instagram,
    };
    let renew = QueueJob {
        request_id: Uuid::new_v4(),
        post_id: None,
        url: REEL_URL.to_string(),
        platform: SocialPlatform::Instagram,
    };

    use clipsight_engine::WorkQueue;
    queue.enqueue(JobKind::Renew, &renew).await.unwrap();
    queue.enqueue(JobKind::Fresh, &fresh).await.unwrap();

    let (kind, job) = queue.pop().await.unwrap().unwrap();
    assert_eq!(kind, JobKind::Fresh);
    assert_eq!(job.request_id, fresh.request_id);
    let (kind, _) = queue.pop().await.unwrap().unwrap();
    assert_eq!(kind, JobKind::Renew);
    assert!(queue.pop().await.unwrap().is_none());
}
