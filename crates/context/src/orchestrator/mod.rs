//! Orchestrator - coordinates the RAG pipeline
//!
//! Chat synthesis:
//! `ExpandingQueries? -> Retrieving -> BuildingPrompt -> Dispatching -> ParsingResponse -> Done`
//!
//! Document analysis skips expansion and retrieval. Expansion and retrieval
//! failures degrade the request; dispatch failures end it in `Failed` and
//! reach the caller unchanged. There is no provider fallback and no retry.

mod request;
mod stage;

pub use request::{AnalysisRequest, AnalysisResponse, RagOptions, SynthesisRequest, SynthesisResponse};
pub use stage::{Stage, StageTracker};

use crate::expander::QueryExpander;
use crate::parser;
use crate::prompts::PromptBuilder;
use crate::providers::{dispatch_with_timeout, http_client, ProviderRegistry, ProviderRequest, ProviderTarget};
use crate::retrieval::{HttpVectorIndex, RetrievalFusion, VectorIndex};
use ragforge_common::{
    config::AppConfig,
    errors::{AppError, Result},
    models::Task,
};
use regex_lite::Regex;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub struct Orchestrator {
    config: Arc<AppConfig>,
    providers: ProviderRegistry,
    fusion: RetrievalFusion,
    expander: QueryExpander,
    prompts: PromptBuilder,
}

impl Orchestrator {
    pub fn new(config: Arc<AppConfig>, providers: ProviderRegistry, index: Arc<dyn VectorIndex>) -> Self {
        let prompts = PromptBuilder::new(config.rag.analysis_max_chars);
        Self {
            fusion: RetrievalFusion::new(index, config.timeouts.retrieval(), config.rag.max_context_chunks),
            expander: QueryExpander::new(prompts.clone(), config.timeouts.for_task(Task::SubQuery)),
            prompts,
            providers,
            config,
        }
    }

    /// HTTP adapters for every provider plus the HTTP vector index
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self> {
        let providers = ProviderRegistry::from_config(&config)?;
        let index = HttpVectorIndex::new(http_client(config.timeouts.connect())?, &config.index);
        Ok(Self::new(config, providers, Arc::new(index)))
    }

    /// Answer `request.query` from the user's documents
    pub async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisResponse> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "synthesize",
            %request_id,
            task = %Task::Synthesis,
            user_id = %request.user_id,
            provider = tracing::field::Empty,
        );
        self.run_synthesis(request_id, request).instrument(span).await
    }

    /// Single-shot FAQ / topics / mind map generation over supplied text
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "analyze",
            %request_id,
            task = %Task::Analysis,
            analysis_type = %request.analysis_type,
            provider = tracing::field::Empty,
        );
        self.run_analysis(request_id, request).instrument(span).await
    }

    async fn run_synthesis(&self, request_id: Uuid, request: SynthesisRequest) -> Result<SynthesisResponse> {
        let start = Instant::now();
        request.check()?;

        let target = ProviderTarget::from_selection(&request.provider, &self.config.providers.default_provider)?;
        tracing::Span::current().record("provider", target.provider.as_str());
        let provider = self.providers.get(target.provider)?;
        provider.preflight(&target.credentials)?;

        let SynthesisRequest {
            user_id,
            query,
            history,
            system_prompt,
            rag,
            ..
        } = request;
        let query = query.trim();
        let mut stages = StageTracker::new();

        let expansion_count = if rag.expand_queries {
            rag.expansion_count.unwrap_or(self.config.rag.subquery_count)
        } else {
            0
        };
        let sub_queries = if expansion_count > 0 {
            stages.advance(Stage::ExpandingQueries);
            self.expander
                .expand(provider.as_ref(), &target, query, expansion_count)
                .await
        } else {
            Vec::new()
        };

        stages.advance(Stage::Retrieving);
        let queries: Vec<String> = std::iter::once(query.to_string())
            .chain(sub_queries.iter().cloned())
            .collect();
        let per_query_k = rag.k.unwrap_or(self.config.rag.default_k);
        let context = self.fusion.fuse(&user_id, &queries, per_query_k).await;

        stages.advance(Stage::BuildingPrompt);
        let prompt = match self.prompts.synthesis(query, &context) {
            Ok(prompt) => prompt,
            Err(e) => {
                stages.advance(Stage::Failed);
                return Err(e);
            }
        };

        stages.advance(Stage::Dispatching);
        let provider_request = ProviderRequest {
            system_prompt,
            history,
            ..target.request(Task::Synthesis, prompt)
        };
        let limit = self.config.timeouts.for_task(Task::Synthesis);
        let result = match dispatch_with_timeout(provider.as_ref(), &provider_request, limit).await {
            Ok(result) => result,
            Err(e) => {
                log_dispatch_failure(&e);
                stages.advance(Stage::Failed);
                return Err(e);
            }
        };

        stages.advance(Stage::ParsingResponse);
        let parsed = parser::parse(&result.raw_text);
        let cited = cited_indices(&parsed.answer, context.len());
        stages.advance(Stage::Done);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            model = %result.model,
            sub_queries = sub_queries.len(),
            context_chunks = context.len(),
            cited = cited.len(),
            has_thinking = parsed.thinking.is_some(),
            processing_time_ms,
            "Synthesis complete"
        );

        Ok(SynthesisResponse {
            request_id,
            answer: parsed.answer,
            thinking: parsed.thinking,
            references: context.references(),
            cited,
            sub_queries,
            provider: target.provider,
            model: result.model,
            processing_time_ms,
        })
    }

    async fn run_analysis(&self, request_id: Uuid, request: AnalysisRequest) -> Result<AnalysisResponse> {
        let start = Instant::now();
        let analysis_type = request.check()?;

        let target = ProviderTarget::from_selection(&request.provider, &self.config.providers.default_provider)?;
        tracing::Span::current().record("provider", target.provider.as_str());
        let provider = self.providers.get(target.provider)?;
        provider.preflight(&target.credentials)?;

        let mut stages = StageTracker::new();

        stages.advance(Stage::BuildingPrompt);
        let prompt = match self
            .prompts
            .analysis(analysis_type, &request.document_text, request.num_items)
        {
            Ok(prompt) => prompt,
            Err(e) => {
                stages.advance(Stage::Failed);
                return Err(e);
            }
        };

        stages.advance(Stage::Dispatching);
        let provider_request = target.request(Task::Analysis, prompt);
        let limit = self.config.timeouts.for_task(Task::Analysis);
        let result = match dispatch_with_timeout(provider.as_ref(), &provider_request, limit).await {
            Ok(result) => result,
            Err(e) => {
                log_dispatch_failure(&e);
                stages.advance(Stage::Failed);
                return Err(e);
            }
        };

        stages.advance(Stage::ParsingResponse);
        let parsed = if analysis_type.expects_reasoning() {
            parser::parse(&result.raw_text)
        } else {
            parser::passthrough(&result.raw_text)
        };
        stages.advance(Stage::Done);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            model = %result.model,
            result_chars = parsed.answer.len(),
            processing_time_ms,
            "Analysis complete"
        );

        Ok(AnalysisResponse {
            request_id,
            document_name: request.document_name,
            analysis_type,
            result: parsed.answer,
            thinking: parsed.thinking,
            provider: target.provider,
            model: result.model,
            processing_time_ms,
        })
    }
}

fn log_dispatch_failure(err: &AppError) {
    if err.is_transient() {
        warn!(error = %err, code = err.kind().as_code(), "Provider dispatch failed");
    } else {
        error!(error = %err, code = err.kind().as_code(), "Provider dispatch failed");
    }
}

fn citation_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\[(\d+(?:\s*,\s*\d+)*)\]").ok())
        .as_ref()
}

/// Distinct `[n]` / `[n, m]` markers in `answer` that point into a context
/// block of `context_len` chunks, ascending
pub fn cited_indices(answer: &str, context_len: usize) -> Vec<usize> {
    let Some(pattern) = citation_pattern() else {
        return Vec::new();
    };

    pattern
        .captures_iter(answer)
        .filter_map(|cap| cap.get(1))
        .flat_map(|group| {
            group
                .as_str()
                .split(',')
                .filter_map(|n| n.trim().parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|&index| index >= 1 && index <= context_len)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
