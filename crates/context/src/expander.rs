//! Query Expander - best-effort sub-query generation
//!
//! Expansion only ever widens retrieval. Every failure is logged and turns
//! into an empty expansion.

use crate::prompts::PromptBuilder;
use crate::providers::{dispatch_with_timeout, LlmProvider, ProviderRequest, ProviderTarget};
use ragforge_common::{
    errors::AppError,
    metrics::{self, Outcome},
    models::Task,
};
use std::time::Duration;
use tracing::{debug, warn};

pub struct QueryExpander {
    prompts: PromptBuilder,
    timeout: Duration,
}

impl QueryExpander {
    /// `timeout` should be shorter than the synthesis deadline
    pub fn new(prompts: PromptBuilder, timeout: Duration) -> Self {
        Self { prompts, timeout }
    }

    /// Up to `count` sub-queries for `original_query`. `count == 0` returns
    /// immediately without touching the provider.
    ///
    /// Lines are trimmed and blank lines dropped. A line repeating the
    /// original query (ASCII case-insensitive) is dropped too, since the
    /// original is always retrieved anyway. Filtering happens before the cap,
    /// so later lines fill in for dropped ones, but a reply of exactly `count`
    /// lines that includes an echo yields fewer than `count` sub-queries.
    pub async fn expand(
        &self,
        provider: &dyn LlmProvider,
        target: &ProviderTarget,
        original_query: &str,
        count: usize,
    ) -> Vec<String> {
        if count == 0 {
            metrics::record_expansion(Outcome::Skipped, 0);
            return Vec::new();
        }

        let prompt = match self.prompts.subquery(original_query, count) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "Sub-query prompt could not be rendered");
                metrics::record_expansion(Outcome::Error, 0);
                return Vec::new();
            }
        };

        // Provider defaults for sampling
        let request = ProviderRequest {
            temperature: None,
            max_tokens: None,
            ..target.request(Task::SubQuery, prompt)
        };

        match dispatch_with_timeout(provider, &request, self.timeout).await {
            Ok(result) => {
                let sub_queries = split_sub_queries(&result.raw_text, original_query, count);
                debug!(produced = sub_queries.len(), model = %result.model, "Sub-queries generated");
                metrics::record_expansion(Outcome::Success, sub_queries.len());
                sub_queries
            }
            Err(e) => {
                let outcome = match e {
                    AppError::ProviderTimeout { .. } => Outcome::Timeout,
                    _ => Outcome::Error,
                };
                warn!(
                    error = %e,
                    provider = %target.provider,
                    "Query expansion failed, continuing with the original query"
                );
                metrics::record_expansion(outcome, 0);
                Vec::new()
            }
        }
    }
}

/// Non-empty trimmed lines, minus echoes of the original query, capped at `count`
fn split_sub_queries(raw: &str, original_query: &str, count: usize) -> Vec<String> {
    let original = original_query.trim();
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.eq_ignore_ascii_case(original))
        .take(count)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeProvider;
    use ragforge_common::models::{ProviderKind, ProviderSelection};

    fn target() -> ProviderTarget {
        ProviderTarget::from_selection(
            &ProviderSelection {
                temperature: Some(0.9),
                ..Default::default()
            },
            "groq",
        )
        .unwrap()
    }

    fn expander(timeout: Duration) -> QueryExpander {
        QueryExpander::new(PromptBuilder::new(30_000), timeout)
    }

    #[tokio::test]
    async fn test_zero_count_makes_no_call() {
        let provider = FakeProvider::replying(ProviderKind::Groq, "a\nb");
        let out = expander(Duration::from_secs(1)).expand(&provider, &target(), "q", 0).await;
        assert!(out.is_empty());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_lines_trimmed_and_capped() {
        let provider = FakeProvider::replying(ProviderKind::Groq, "  first  \n\n second\nthird\nfourth\n");
        let out = expander(Duration::from_secs(1))
            .expand(&provider, &target(), "original", 3)
            .await;

        assert_eq!(out, vec!["first", "second", "third"]);

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].task, Task::SubQuery);
        assert_eq!(calls[0].temperature, None);
        assert!(calls[0].user_message.contains("\"original\""));
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let provider = FakeProvider::replying(ProviderKind::Groq, "unused").with_failure(Task::SubQuery, |provider| {
            AppError::ProviderRateLimited {
                provider,
                message: "quota".into(),
            }
        });
        let out = expander(Duration::from_secs(1)).expand(&provider, &target(), "q", 3).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_swallowed() {
        let provider = FakeProvider::replying(ProviderKind::Groq, "late").with_delay(Duration::from_millis(200));
        let out = expander(Duration::from_millis(20)).expand(&provider, &target(), "q", 3).await;
        assert!(out.is_empty());
    }

    #[test]
    fn test_echo_of_original_dropped() {
        let out = split_sub_queries("What is X?\nhow X is defined\n", "what is x?", 3);
        assert_eq!(out, vec!["how X is defined"]);

        // Later lines fill in for a dropped echo
        let out = split_sub_queries("a\nWHAT IS X?\nb\n", "what is x?", 2);
        assert_eq!(out, vec!["a", "b"]);

        // Nothing left to fill in: short result
        let out = split_sub_queries("What is X?\na\nb\n", "what is x?", 3);
        assert_eq!(out, vec!["a", "b"]);
    }
}
