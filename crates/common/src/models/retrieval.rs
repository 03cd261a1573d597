use serde::{Deserialize, Serialize};

/// Chunk returned by the external vector index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    /// Identifier of the stored source (server-side file name)
    pub source_id: String,

    /// Chunk text
    pub content: String,

    /// Similarity score as reported by the index. Display only.
    pub score: f32,

    /// Human readable document name
    pub document_name: String,
}

/// Reference emitted alongside a synthesized answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    /// 1-based citation index, matching `[n]` markers in the prompt
    pub index: usize,
    pub document_name: String,
    pub score: f32,
}
