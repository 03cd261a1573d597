//! Prompt Builder - renders task prompts with bounded interpolation
//!
//! Rendering is pure. Each template declares the variables it needs; a
//! missing one is a `TemplateBinding` defect, never a retry condition.

pub mod templates;

use crate::retrieval::ContextBlock;
use ragforge_common::{
    errors::{AppError, Result},
    models::AnalysisType,
};
use std::borrow::Cow;
use std::fmt;

/// Put in place of the context when retrieval found nothing
pub const NO_CONTEXT_MARKER: &str = "No relevant context was found in the user's documents for this query.";

/// Appended on its own line to a cut document excerpt
pub const TRUNCATION_MARKER: &str = "[...DOCUMENT TRUNCATED FOR ANALYSIS...]";

/// Upper bound on requested analysis items
pub const MAX_ANALYSIS_ITEMS: usize = 20;

/// Template keyed by task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateId {
    Synthesis,
    SubQuery,
    Analysis(AnalysisType),
}

impl TemplateId {
    /// Variables that must be bound before rendering
    pub fn required_vars(&self) -> &'static [&'static str] {
        match self {
            TemplateId::Synthesis => &["query", "context"],
            TemplateId::SubQuery => &["query", "count"],
            TemplateId::Analysis(AnalysisType::Mindmap) => &["document"],
            TemplateId::Analysis(_) => &["document", "num_items"],
        }
    }

    fn text(&self) -> Cow<'static, str> {
        match self {
            TemplateId::Synthesis => Cow::Borrowed(templates::SYNTHESIS),
            TemplateId::SubQuery => Cow::Borrowed(templates::SUBQUERY),
            TemplateId::Analysis(AnalysisType::Faq) => Cow::Owned(templates::faq()),
            TemplateId::Analysis(AnalysisType::Topics) => Cow::Owned(templates::topics()),
            TemplateId::Analysis(AnalysisType::Mindmap) => Cow::Borrowed(templates::MINDMAP),
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateId::Synthesis => f.write_str("synthesis"),
            TemplateId::SubQuery => f.write_str("subquery"),
            TemplateId::Analysis(kind) => write!(f, "analysis:{}", kind),
        }
    }
}

/// Render `template` with `vars`.
///
/// Substitution is single pass: bound values are never scanned for
/// placeholders, so user text containing `{query}` stays literal.
pub fn render(template: TemplateId, vars: &[(&str, &str)]) -> Result<String> {
    let lookup = |name: &str| vars.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

    if let Some(missing) = template.required_vars().iter().find(|name| lookup(**name).is_none()) {
        return Err(binding_error(template, missing));
    }

    let text = template.text();
    let mut out = String::with_capacity(text.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest: &str = &text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder(&after[..close]) => {
                let name = &after[..close];
                let value = lookup(name).ok_or_else(|| binding_error(template, name))?;
                out.push_str(value);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    Ok(out)
}

fn is_placeholder(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c == '_')
}

fn binding_error(template: TemplateId, variable: &str) -> AppError {
    tracing::error!(
        template = %template,
        variable = variable,
        defect = true,
        "Prompt template rendered without a required variable"
    );
    AppError::TemplateBinding {
        template: template.to_string(),
        variable: variable.to_string(),
    }
}

/// Cut `text` to `max_chars` characters, appending the truncation marker
/// when anything was removed.
pub fn truncate_excerpt(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}\n{}", &text[..cut], TRUNCATION_MARKER)),
        None => Cow::Borrowed(text),
    }
}

/// Default analysis item count for an excerpt of `excerpt_chars` characters
pub fn default_item_count(excerpt_chars: usize) -> usize {
    let count = match excerpt_chars {
        0..=999 => 3,
        1000..=4999 => 5,
        5000..=14999 => 10,
        _ => 15,
    };
    count.min(MAX_ANALYSIS_ITEMS)
}

/// Task-level prompt assembly over the raw templates
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    analysis_max_chars: usize,
}

impl PromptBuilder {
    pub fn new(analysis_max_chars: usize) -> Self {
        Self { analysis_max_chars }
    }

    /// Synthesis prompt over the citation-numbered context
    pub fn synthesis(&self, query: &str, context: &ContextBlock) -> Result<String> {
        let context_text = if context.is_empty() {
            NO_CONTEXT_MARKER.to_string()
        } else {
            context.render()
        };
        render(TemplateId::Synthesis, &[("query", query), ("context", context_text.as_str())])
    }

    pub fn subquery(&self, query: &str, count: usize) -> Result<String> {
        let count = count.to_string();
        render(TemplateId::SubQuery, &[("query", query), ("count", count.as_str())])
    }

    /// Analysis prompt over a bounded document excerpt. `num_items` defaults
    /// from the excerpt length and is clamped to `1..=MAX_ANALYSIS_ITEMS`.
    pub fn analysis(&self, kind: AnalysisType, document_text: &str, num_items: Option<usize>) -> Result<String> {
        let excerpt = truncate_excerpt(document_text, self.analysis_max_chars);
        if let Cow::Owned(_) = excerpt {
            tracing::warn!(
                original_chars = document_text.chars().count(),
                max_chars = self.analysis_max_chars,
                "Document truncated for analysis"
            );
        }

        let items = num_items
            .unwrap_or_else(|| default_item_count(excerpt.chars().count()))
            .clamp(1, MAX_ANALYSIS_ITEMS)
            .to_string();

        render(
            TemplateId::Analysis(kind),
            &[("document", excerpt.as_ref()), ("num_items", items.as_str())],
        )
    }
}
