//! Orchestrator request and response types

use ragforge_common::{
    errors::{AppError, Result},
    models::{AnalysisType, ChatTurn, ProviderKind, ProviderSelection, Reference},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// Chat synthesis over the user's documents
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SynthesisRequest {
    /// Owner of the documents searched (required)
    #[serde(default)]
    #[validate(length(min = 1, max = 256, message = "user_id must be 1-256 characters"))]
    pub user_id: String,

    /// User query (required, 1-8000 chars)
    #[serde(default)]
    #[validate(length(min = 1, max = 8000, message = "query must be 1-8000 characters"))]
    pub query: String,

    /// Prior turns, oldest first
    #[serde(default)]
    pub history: Vec<ChatTurn>,

    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub provider: ProviderSelection,

    #[serde(default)]
    pub rag: RagOptions,
}

/// Retrieval tuning for one synthesis request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RagOptions {
    /// Generate sub-queries before retrieval
    #[serde(default)]
    pub expand_queries: bool,

    /// Sub-queries wanted when expanding (default: configured count)
    #[serde(default)]
    #[validate(range(max = 10, message = "expansion_count must be at most 10"))]
    pub expansion_count: Option<usize>,

    /// Chunks per query (default: configured k)
    #[serde(default)]
    #[validate(range(min = 1, max = 50, message = "k must be 1-50"))]
    pub k: Option<usize>,
}

impl SynthesisRequest {
    /// Field checks. Runs before anything touches a collaborator.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(validation_error)?;
        self.rag.validate().map_err(validation_error)?;

        // Additional validation
        if self.user_id.trim().is_empty() {
            return Err(AppError::missing_field("user_id"));
        }
        if self.query.trim().is_empty() {
            return Err(AppError::missing_field("query"));
        }
        Ok(())
    }
}

/// Single-shot analysis of supplied document text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub document_text: String,

    /// `faq`, `topics` or `mindmap`
    #[serde(default)]
    pub analysis_type: String,

    /// Echoed back in the response
    #[serde(default)]
    pub document_name: Option<String>,

    #[serde(default)]
    pub provider: ProviderSelection,

    /// Target item count for FAQ / topics (default: derived from length)
    #[serde(default)]
    pub num_items: Option<usize>,
}

impl AnalysisRequest {
    pub fn check(&self) -> Result<AnalysisType> {
        if self.document_text.trim().is_empty() {
            return Err(AppError::missing_field("document_text"));
        }
        if self.analysis_type.trim().is_empty() {
            return Err(AppError::missing_field("analysis_type"));
        }
        self.analysis_type.parse()
    }
}

fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |err| {
                (
                    field.to_string(),
                    err.message.as_ref().map(|m| m.to_string()).unwrap_or_default(),
                )
            })
        })
        .collect();
    fields.sort();

    let field = fields.first().map(|(field, _)| field.clone());
    let message = fields
        .into_iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ");

    AppError::InvalidRequest { message, field }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisResponse {
    pub request_id: Uuid,

    /// User-facing answer, never empty
    pub answer: String,

    /// Exposed model reasoning, if any
    pub thinking: Option<String>,

    /// Context chunks in fused order
    pub references: Vec<Reference>,

    /// Citation indices the answer actually uses, ascending
    pub cited: Vec<usize>,

    /// Expansions used for retrieval, excluding the original query
    pub sub_queries: Vec<String>,

    pub provider: ProviderKind,
    pub model: String,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub request_id: Uuid,
    pub document_name: Option<String>,
    pub analysis_type: AnalysisType,
    pub result: String,
    pub thinking: Option<String>,
    pub provider: ProviderKind,
    pub model: String,
    pub processing_time_ms: u64,
}
