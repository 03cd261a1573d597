use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Kind of single-shot document analysis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    /// Question / answer pairs
    Faq,
    /// Bulleted key topics
    Topics,
    /// Mermaid mind map syntax, consumed raw
    Mindmap,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 3] = [AnalysisType::Faq, AnalysisType::Topics, AnalysisType::Mindmap];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Faq => "faq",
            AnalysisType::Topics => "topics",
            AnalysisType::Mindmap => "mindmap",
        }
    }

    /// Whether the output may lead with a reasoning block
    pub fn expects_reasoning(&self) -> bool {
        !matches!(self, AnalysisType::Mindmap)
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        AnalysisType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| AppError::InvalidRequest {
                message: format!("analysis type '{}' is not supported", s),
                field: Some("analysis_type".to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_parse_analysis_type() {
        assert_eq!("FAQ".parse::<AnalysisType>().unwrap(), AnalysisType::Faq);
        assert_eq!(" topics ".parse::<AnalysisType>().unwrap(), AnalysisType::Topics);
        assert_eq!("mindmap".parse::<AnalysisType>().unwrap(), AnalysisType::Mindmap);
    }

    #[test]
    fn test_unknown_analysis_type_is_invalid_request() {
        let err = "summary".parse::<AnalysisType>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_mindmap_has_no_reasoning() {
        assert!(AnalysisType::Faq.expects_reasoning());
        assert!(!AnalysisType::Mindmap.expects_reasoning());
    }
}
