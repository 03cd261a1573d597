//! Response Parser - splits model output into reasoning and answer
//!
//! Reasoning is honoured only when it leads the response. Malformed or
//! misplaced delimiters degrade to "everything is the answer"; parsing
//! never fails.

use ragforge_common::models::ParsedAnswer;

pub const REASONING_OPEN: &str = "<reasoning>";
pub const REASONING_CLOSE: &str = "</reasoning>";

/// Substituted when the model produced reasoning and nothing else
pub const REASONING_ONLY_PLACEHOLDER: &str = "[response contained only reasoning]";

/// Substituted when the model produced no text at all
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "[response was empty]";

/// Split `raw` into `{answer, thinking}`.
///
/// Consecutive leading reasoning blocks are all consumed, so the returned
/// answer never starts with a complete block itself.
pub fn parse(raw: &str) -> ParsedAnswer {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return passthrough(trimmed);
    }

    let mut rest = trimmed;
    let mut blocks: Vec<&str> = Vec::new();
    let mut consumed = false;

    while let Some(after_open) = rest.strip_prefix(REASONING_OPEN) {
        let Some(end) = after_open.find(REASONING_CLOSE) else {
            // Unclosed: leave it in the answer
            break;
        };
        let inner = after_open[..end].trim();
        if !inner.is_empty() {
            blocks.push(inner);
        }
        rest = after_open[end + REASONING_CLOSE.len()..].trim_start();
        consumed = true;
    }

    if !consumed {
        return passthrough(trimmed);
    }

    let answer = rest.trim_end();
    ParsedAnswer {
        answer: if answer.is_empty() {
            REASONING_ONLY_PLACEHOLDER.to_string()
        } else {
            answer.to_string()
        },
        thinking: (!blocks.is_empty()).then(|| blocks.join("\n\n")),
    }
}

/// Take the whole response as the answer, for output consumed verbatim
/// (mind maps). Only the empty-response placeholder applies.
pub fn passthrough(raw: &str) -> ParsedAnswer {
    let trimmed = raw.trim();
    ParsedAnswer {
        answer: if trimmed.is_empty() {
            EMPTY_RESPONSE_PLACEHOLDER.to_string()
        } else {
            trimmed.to_string()
        },
        thinking: None,
    }
}
