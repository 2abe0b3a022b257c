//! The asynchronous analysis pipeline: request deduplication and rate
//! limiting at the ingest gate, the single-consumer queue dispatcher, the
//! scrape and analysis orchestrators, multilingual content normalization,
//! and the deterministic viral-score heuristic.

pub mod analysis;
pub mod dispatcher;
pub mod ingest;
pub mod language;
pub mod normalize;
pub mod platform;
pub mod scoring;
pub mod scrape;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use analysis::AnalysisOrchestrator;
pub use dispatcher::QueueDispatcher;
pub use ingest::{IngestGate, QueueTicket, Submitter};
pub use language::{LanguageDetect, LinguaDetector};
pub use normalize::ContentNormalizer;
pub use scrape::ScrapeOrchestrator;
pub use traits::{ContentStore, ReelSource, VideoAnalyst, WorkQueue};
