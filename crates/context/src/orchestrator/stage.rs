//! Pipeline stages and their legal transitions

use std::fmt;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Request validated, pipeline not yet started
    Accepted,
    ExpandingQueries,
    Retrieving,
    BuildingPrompt,
    Dispatching,
    ParsingResponse,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Accepted => "accepted",
            Stage::ExpandingQueries => "expanding_queries",
            Stage::Retrieving => "retrieving",
            Stage::BuildingPrompt => "building_prompt",
            Stage::Dispatching => "dispatching",
            Stage::ParsingResponse => "parsing_response",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// Expansion may be skipped (chat without expansion), and retrieval too
    /// (document analysis). Prompt rendering failure is a defect path into
    /// `Failed`.
    pub fn can_transition_to(&self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Accepted, ExpandingQueries)
                | (Accepted, Retrieving)
                | (Accepted, BuildingPrompt)
                | (ExpandingQueries, Retrieving)
                | (Retrieving, BuildingPrompt)
                | (Retrieving, Failed)
                | (BuildingPrompt, Dispatching)
                | (BuildingPrompt, Failed)
                | (Dispatching, ParsingResponse)
                | (Dispatching, Failed)
                | (ParsingResponse, Done)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stage of one request, with elapsed time per transition
#[derive(Debug)]
pub struct StageTracker {
    current: Stage,
    entered: Instant,
    history: Vec<Stage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: Stage::Accepted,
            entered: Instant::now(),
            history: vec![Stage::Accepted],
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    /// Stages visited so far, in order
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.current.can_transition_to(next),
            "illegal stage transition {} -> {}",
            self.current,
            next
        );
        debug!(
            from = %self.current,
            to = %next,
            elapsed_ms = self.entered.elapsed().as_millis() as u64,
            "Stage transition"
        );
        self.current = next;
        self.entered = Instant::now();
        self.history.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_path_with_expansion() {
        let mut tracker = StageTracker::new();
        for stage in [
            Stage::ExpandingQueries,
            Stage::Retrieving,
            Stage::BuildingPrompt,
            Stage::Dispatching,
            Stage::ParsingResponse,
            Stage::Done,
        ] {
            tracker.advance(stage);
        }
        assert!(tracker.current().is_terminal());
        assert_eq!(tracker.history().len(), 7);
    }

    #[test]
    fn test_failed_reachable_only_from_fallible_stages() {
        assert!(Stage::Dispatching.can_transition_to(Stage::Failed));
        assert!(Stage::Retrieving.can_transition_to(Stage::Failed));
        assert!(!Stage::ExpandingQueries.can_transition_to(Stage::Failed));
        assert!(!Stage::ParsingResponse.can_transition_to(Stage::Failed));
        assert!(!Stage::Done.can_transition_to(Stage::Failed));
    }

    #[test]
    fn test_analysis_skips_expansion_and_retrieval() {
        assert!(Stage::Accepted.can_transition_to(Stage::BuildingPrompt));
        assert!(!Stage::ExpandingQueries.can_transition_to(Stage::BuildingPrompt));
    }
}
