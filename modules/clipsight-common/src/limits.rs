/// A completed post younger than this is served from the store without
/// re-queueing; older posts get a renew job (stats refresh + re-score).
pub const FRESHNESS_WINDOW_HOURS: i64 = 1200;

/// Accepted submissions per anonymous IP per UTC calendar day, enforced
/// only for content with no existing Post row.
pub const ANON_DAILY_SUBMISSION_LIMIT: i64 = 2;

/// How many of the author's recent reels feed the rolling channel averages.
pub const PEER_SAMPLE_SIZE: u32 = 30;

/// Cap on audience comment texts forwarded to the analysis prompt.
pub const COMMENT_SAMPLE_MAX: usize = 20;

/// A pending request untouched this long is assumed to have lost its queue
/// message (crash between upsert and enqueue) and is re-enqueued on the
/// next submission of the same content.
pub const PENDING_REQUEUE_AFTER_MINUTES: i64 = 15;

/// Submit-time estimates returned to the client, in seconds.
pub const ESTIMATE_SHORT_FORM_SECS: u32 = 60;
pub const ESTIMATE_LONG_FORM_SECS: u32 = 120;
pub const ESTIMATE_RENEW_SECS: u32 = 10;
