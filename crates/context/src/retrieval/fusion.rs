//! Retrieval Fusion Engine
//!
//! Lookups for all queries run concurrently; the merge is applied afterwards
//! in query order (original first), so completion order never changes the
//! fused block.

use super::{ContextBlock, VectorIndex};
use futures::future::join_all;
use ragforge_common::metrics;
use ragforge_common::models::RetrievedChunk;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct RetrievalFusion {
    index: Arc<dyn VectorIndex>,
    query_timeout: Duration,
    max_chunks: usize,
}

impl RetrievalFusion {
    pub fn new(index: Arc<dyn VectorIndex>, query_timeout: Duration, max_chunks: usize) -> Self {
        Self {
            index,
            query_timeout,
            max_chunks,
        }
    }

    /// Fan `queries` out to the index and merge the hits.
    ///
    /// A failed or timed-out lookup contributes nothing; the result may be
    /// an empty block but never an error.
    pub async fn fuse(&self, user_id: &str, queries: &[String], per_query_k: usize) -> ContextBlock {
        let start = Instant::now();

        let lookups = queries.iter().enumerate().map(|(position, query)| async move {
            match tokio::time::timeout(self.query_timeout, self.index.query(user_id, query, per_query_k)).await {
                Ok(Ok(chunks)) => chunks,
                Ok(Err(e)) => {
                    warn!(error = %e, query_position = position, "Vector index lookup failed");
                    Vec::new()
                }
                Err(_) => {
                    warn!(
                        query_position = position,
                        timeout_ms = self.query_timeout.as_millis() as u64,
                        "Vector index lookup timed out"
                    );
                    Vec::new()
                }
            }
        });

        let per_query = join_all(lookups).await;
        let retrieved: usize = per_query.iter().map(Vec::len).sum();
        let block = merge(per_query, self.max_chunks);

        debug!(
            queries = queries.len(),
            retrieved,
            kept = block.len(),
            "Retrieval fused"
        );
        metrics::record_retrieval(queries.len(), block.len(), start.elapsed().as_secs_f64());

        block
    }
}

/// First-query-wins merge keyed by chunk content, truncated to `max_chunks`.
///
/// `per_query` must be in priority order. A duplicate keeps the score and
/// position of its first occurrence.
pub fn merge(per_query: Vec<Vec<RetrievedChunk>>, max_chunks: usize) -> ContextBlock {
    let mut seen: HashSet<String> = HashSet::new();
    let mut fused = Vec::new();

    for chunk in per_query.into_iter().flatten() {
        if fused.len() >= max_chunks {
            break;
        }
        if seen.insert(chunk.content.clone()) {
            fused.push(chunk);
        }
    }

    ContextBlock::new(fused)
}
