//! Provider identity, credentials and per-request selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Supported LLM backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Groq,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Gemini, ProviderKind::Groq, ProviderKind::Ollama];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Groq => "groq",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    /// Accepts the bare name or any identifier prefixed by it (`groq_llama3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| wanted.starts_with(kind.as_str()))
            .ok_or_else(|| AppError::UnsupportedProvider {
                provider: s.to_string(),
            })
    }
}

/// Pipeline task a model is used for. Default models differ per task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Analysis,
    SubQuery,
    Synthesis,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Analysis => "analysis",
            Task::SubQuery => "subquery",
            Task::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user API keys carried by a request
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiKeys {
    #[serde(default)]
    pub gemini: Option<String>,
    #[serde(default)]
    pub groq: Option<String>,
}

impl ApiKeys {
    /// Key supplied for `provider`, ignoring blank values
    pub fn for_provider(&self, provider: ProviderKind) -> Option<&str> {
        let key = match provider {
            ProviderKind::Gemini => self.gemini.as_deref(),
            ProviderKind::Groq => self.groq.as_deref(),
            ProviderKind::Ollama => None,
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "***");
        f.debug_struct("ApiKeys")
            .field("gemini", &redact(&self.gemini))
            .field("groq", &redact(&self.groq))
            .finish()
    }
}

/// Which backend to use for a request and how to call it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSelection {
    /// Provider identifier; falls back to the configured default
    #[serde(default)]
    pub provider: Option<String>,

    /// Model name; falls back to the per-task default
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Overrides the configured Ollama base URL
    #[serde(default)]
    pub ollama_url: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_provider_prefix_parsing() {
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("groq_llama3".parse::<ProviderKind>().unwrap(), ProviderKind::Groq);
        assert_eq!("Ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
    }

    #[test]
    fn test_unknown_provider() {
        let err = "openai".parse::<ProviderKind>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProvider);
    }

    #[test]
    fn test_blank_key_is_absent() {
        let keys = ApiKeys {
            gemini: Some("   ".into()),
            groq: Some("gsk-123".into()),
        };
        assert_eq!(keys.for_provider(ProviderKind::Gemini), None);
        assert_eq!(keys.for_provider(ProviderKind::Groq), Some("gsk-123"));
        assert_eq!(keys.for_provider(ProviderKind::Ollama), None);
    }

    #[test]
    fn test_api_keys_debug_is_redacted() {
        let keys = ApiKeys {
            gemini: Some("secret-gemini".into()),
            groq: None,
        };
        let rendered = format!("{:?}", keys);
        assert!(!rendered.contains("secret-gemini"));
        assert!(rendered.contains("***"));
    }
}
