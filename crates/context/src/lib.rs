//! RagForge Context Engine
//!
//! Retrieval-augmented answering over a user's documents:
//! - Query expansion through the selected LLM
//! - Parallel retrieval with first-seen fusion
//! - Prompt assembly with numbered citations
//! - Gemini, Groq and Ollama dispatch under per-task deadlines
//! - Reasoning extraction from model output

pub mod expander;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod providers;
pub mod retrieval;

#[cfg(test)]
mod test_support;

pub use orchestrator::{
    AnalysisRequest, AnalysisResponse, Orchestrator, RagOptions, SynthesisRequest, SynthesisResponse,
};
pub use providers::{LlmProvider, ProviderRegistry};
pub use retrieval::{ContextBlock, VectorIndex};
