use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::llm::decision::Decision;
use crate::perception::types::ProfileView;

/// Lifecycle states of the review loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Capturing { key: String },
    Evaluating,
    Deciding { decision: Decision },
    Acting { action: Action },
    /// Waiting for the page to move on from `from`.
    Advancing { from: String },
    Terminated,
}

/// The closed set of page actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Save,
    SendWithMessage(String),
    Skip,
    /// Wait for the page to leave the canonical address `from`.
    AwaitNext { from: String },
}

impl Action {
    /// `false → Skip`, `true + empty → Save`, `true + text → SendWithMessage`.
    pub fn from_decision(decision: &Decision) -> Self {
        if !decision.is_good_fit {
            return Action::Skip;
        }
        let message = decision.intro_message.trim();
        if message.is_empty() {
            Action::Save
        } else {
            Action::SendWithMessage(message.to_string())
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Save => ActionKind::Save,
            Action::SendWithMessage(_) => ActionKind::SendWithMessage,
            Action::Skip => ActionKind::Skip,
            Action::AwaitNext { .. } => ActionKind::AwaitNext,
        }
    }
}

/// Payload-free tag of an [`Action`], for logs and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Save,
    SendWithMessage,
    Skip,
    AwaitNext,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Save => "save",
            ActionKind::SendWithMessage => "send_with_message",
            ActionKind::Skip => "skip",
            ActionKind::AwaitNext => "await_next",
        })
    }
}

/// Mutable state of one run. Lives only as long as the run.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub budget: usize,
    pub visited: HashSet<String>,
    pub current: Option<ProfileView>,
}

impl Session {
    pub fn new(budget: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            budget,
            visited: HashSet::new(),
            current: None,
        }
    }

    /// Records `key`; returns false if it had already been visited.
    pub fn record_visit(&mut self, key: &str) -> bool {
        self.visited.insert(key.to_string())
    }

    pub fn processed(&self) -> usize {
        self.visited.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.visited.len() >= self.budget
    }
}

/// What a finished run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub session_id: String,
    pub processed: usize,
    pub saved: usize,
    pub sent: usize,
    pub skipped: usize,
    /// Save/Send attempts that fell back to Skip.
    pub fallbacks: usize,
    /// Evaluations that failed and were replaced by a negative decision.
    pub degraded_evaluations: usize,
    pub revisits: usize,
    pub archived: Vec<PathBuf>,
}

impl RunSummary {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            ..Self::default()
        }
    }

    pub fn record_action(&mut self, performed: ActionKind, fell_back: bool) {
        match performed {
            ActionKind::Save => self.saved += 1,
            ActionKind::SendWithMessage => self.sent += 1,
            ActionKind::Skip => self.skipped += 1,
            ActionKind::AwaitNext => {}
        }
        if fell_back {
            self.fallbacks += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_mapping_is_total() {
        assert_eq!(Action::from_decision(&Decision::new(false, "")), Action::Skip);
        assert_eq!(Action::from_decision(&Decision::new(false, "Hi")), Action::Skip);
        assert_eq!(Action::from_decision(&Decision::new(true, "")), Action::Save);
        assert_eq!(Action::from_decision(&Decision::new(true, "  \n")), Action::Save);
        assert_eq!(
            Action::from_decision(&Decision::new(true, "x")),
            Action::SendWithMessage("x".into())
        );
    }

    #[test]
    fn session_counts_distinct_keys_only() {
        let mut session = Session::new(2);
        assert!(session.record_visit("https://example.test/a"));
        assert!(!session.record_visit("https://example.test/a"));
        assert!(!session.is_exhausted());
        assert!(session.record_visit("https://example.test/b"));
        assert_eq!(session.processed(), 2);
        assert!(session.is_exhausted());
    }

    #[test]
    fn summary_tallies_fallbacks_separately() {
        let mut summary = RunSummary::new("s");
        summary.record_action(ActionKind::Skip, true);
        summary.record_action(ActionKind::Save, false);
        summary.record_action(ActionKind::AwaitNext, false);
        assert_eq!((summary.saved, summary.skipped, summary.fallbacks), (1, 1, 1));
    }
}
