//! Retrieval over the external vector index
//!
//! - [`VectorIndex`]: the consumed lookup contract
//! - [`RetrievalFusion`]: multi-query fan-out with first-query-wins merging
//! - [`HttpVectorIndex`]: lookup against the index service over HTTP

mod fusion;
mod http_index;

pub use fusion::{merge, RetrievalFusion};
pub use http_index::HttpVectorIndex;

use ragforge_common::errors::Result;
use ragforge_common::models::{Reference, RetrievedChunk};

/// Similarity lookup owned by an external service. Results arrive ranked.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top-`k` chunks for `text` within `user_id`'s documents
    async fn query(&self, user_id: &str, text: &str, k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// De-duplicated chunks in fused order. A chunk's citation index is its
/// 1-based position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBlock {
    chunks: Vec<RetrievedChunk>,
}

impl ContextBlock {
    pub fn new(chunks: Vec<RetrievedChunk>) -> Self {
        Self { chunks }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> &[RetrievedChunk] {
        &self.chunks
    }

    /// Chunks paired with their citation index
    pub fn cited(&self) -> impl Iterator<Item = (usize, &RetrievedChunk)> {
        self.chunks.iter().enumerate().map(|(i, chunk)| (i + 1, chunk))
    }

    /// Numbered text injected into the synthesis prompt
    pub fn render(&self) -> String {
        self.cited()
            .map(|(index, chunk)| format!("[{}] Source: {}\n{}", index, chunk.document_name, chunk.content.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// `{documentName, score}` per chunk, in fused order
    pub fn references(&self) -> Vec<Reference> {
        self.cited()
            .map(|(index, chunk)| Reference {
                index,
                document_name: chunk.document_name.clone(),
                score: chunk.score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references_follow_position() {
        let block = ContextBlock::new(vec![
            RetrievedChunk {
                source_id: "a.pdf".into(),
                content: "  first  ".into(),
                score: 0.4,
                document_name: "a".into(),
            },
            RetrievedChunk {
                source_id: "b.pdf".into(),
                content: "second".into(),
                score: 0.9,
                document_name: "b".into(),
            },
        ]);

        let refs = block.references();
        assert_eq!(refs.len(), 2);
        assert_eq!((refs[0].index, refs[0].document_name.as_str()), (1, "a"));
        assert_eq!((refs[1].index, refs[1].score), (2, 0.9));

        assert_eq!(block.render(), "[1] Source: a\nfirst\n\n[2] Source: b\nsecond");
    }
}
