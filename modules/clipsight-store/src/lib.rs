//! Postgres persistence for the analysis pipeline: posts, analyze
//! requests, channels and their history snapshots, normalized content,
//! analysis verdicts, and the FIFO work queue.

pub mod analyses;
pub mod channels;
pub mod contents;
pub mod error;
pub mod posts;
pub mod queue;
pub mod requests;

pub use error::{Result, StoreError};

use sqlx::PgPool;

/// All entity persistence behind one pool-holding handle. Last writer
/// wins per row; the queue dispatcher is the only writer that moves
/// Post/AnalyzeRequest status away from pending.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}
