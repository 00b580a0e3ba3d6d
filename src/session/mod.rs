//! Work/break session cycling.
//!
//! Each call to `SessionMachine::advance` flips the mode once:
//! - into work: the priority resolver picks the issue to work on,
//! - into break: the break-suggestion pointer moves one step (wrapping).
//!
//! The new state is written before anything is reported. A failed write is
//! logged and the state lives on in memory; it never fails the toggle.

mod persistence;
mod state;

pub use persistence::{SessionContext, SessionStore};
pub use state::{SessionMode, SessionState};

use log::info;

use crate::domain::Issue;
use crate::error::Result;
use crate::resolver::Resolver;
use crate::tracker::IssueTracker;

/// Reported when the break-suggestion list is empty
pub const NO_SUGGESTIONS_MESSAGE: &str = "No break suggestions available";

/// Suggestions used when the configuration does not provide any
pub const DEFAULT_BREAK_SUGGESTIONS: &[&str] = &[
    "Stand up and stretch for five minutes",
    "Take a short walk outside",
    "Refill your water glass",
    "Rest your eyes: look at something far away for a minute",
    "Do a few deep breaths away from the screen",
];

/// What the new session mode brings with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionReport {
    /// Entered work mode; None when there are no open issues
    Work { issue: Option<Issue> },
    /// Entered break mode; None when there are no suggestions
    Break { suggestion: Option<String> },
}

impl SessionReport {
    pub fn mode(&self) -> SessionMode {
        match self {
            SessionReport::Work { .. } => SessionMode::Work,
            SessionReport::Break { .. } => SessionMode::Break,
        }
    }

    /// One-line, human readable summary
    pub fn message(&self) -> String {
        match self {
            SessionReport::Work { issue: Some(issue) } => {
                format!("Work on #{} {}: {}", issue.number, issue.title, issue.html_url)
            }
            SessionReport::Work { issue: None } => "No open issues".to_string(),
            SessionReport::Break { suggestion: Some(s) } => s.clone(),
            SessionReport::Break { suggestion: None } => NO_SUGGESTIONS_MESSAGE.to_string(),
        }
    }
}

/// Result of one session toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// State after the toggle
    pub state: SessionState,
    /// False when the state only lives in memory
    pub persisted: bool,
    pub report: SessionReport,
}

/// Toggles the session and produces the report for the new mode
pub struct SessionMachine {
    context: SessionContext,
    suggestions: Vec<String>,
    resolver: Resolver,
}

impl SessionMachine {
    pub fn new(context: SessionContext, suggestions: Vec<String>) -> Self {
        Self {
            context,
            suggestions,
            resolver: Resolver::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Current state without changing anything
    pub fn current(&self) -> SessionState {
        self.context.load()
    }

    /// Flip the mode, persist, then report.
    ///
    /// Only a failure to list issues when entering work is an error; the new
    /// state has been saved by then.
    pub async fn advance(&mut self, tracker: &dyn IssueTracker) -> Result<SessionOutcome> {
        let (state, persisted) = {
            let _lock = self.context.try_lock();
            let mut state = self.context.load();
            state.mode = state.mode.toggled();
            if state.mode == SessionMode::Break {
                state.advance_break(self.suggestions.len());
            }
            let persisted = self.context.persist(&state);
            (state, persisted)
        };
        info!(
            "Session switched to {} (lastBreakIndex {})",
            state.mode, state.last_break_index
        );

        let report = match state.mode {
            SessionMode::Work => SessionReport::Work {
                issue: self.resolver.fetch_and_select(tracker).await?,
            },
            SessionMode::Break => SessionReport::Break {
                suggestion: self.suggestion_at(state.last_break_index),
            },
        };

        Ok(SessionOutcome {
            state,
            persisted,
            report,
        })
    }

    fn suggestion_at(&self, index: i64) -> Option<String> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.suggestions.get(i))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TriageError;
    use crate::tracker::MockTracker;
    use std::fs;
    use tempfile::TempDir;

    fn machine(dir: &TempDir, suggestions: &[&str]) -> SessionMachine {
        let store = SessionStore::new(dir.path().join("state.json"));
        SessionMachine::new(
            SessionContext::new(store),
            suggestions.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn issue(number: u64, labels: &[&str], updated_at: &str) -> Issue {
        Issue::new(number, format!("Issue {}", number))
            .with_labels(labels.iter().copied())
            .with_updated_at(updated_at)
            .with_html_url(format!("https://github.com/o/r/issues/{}", number))
    }

    #[tokio::test]
    async fn test_first_run_enters_work() {
        let dir = TempDir::new().unwrap();
        let mut machine = machine(&dir, &["A", "B"]);
        let tracker = MockTracker::new([issue(1, &[], "2023-05-01"), issue(2, &["urgent"], "2023-06-01")]);

        let outcome = machine.advance(&tracker).await.unwrap();

        assert_eq!(outcome.state.mode, SessionMode::Work);
        assert_eq!(outcome.state.last_break_index, -1);
        assert!(outcome.persisted);
        match outcome.report {
            SessionReport::Work { issue: Some(issue) } => assert_eq!(issue.number, 2),
            other => panic!("unexpected report {:?}", other),
        }
        let saved = fs::read_to_string(dir.path().join("state.json")).unwrap();
        assert!(saved.contains("\"work\""));
    }

    #[tokio::test]
    async fn test_break_advances_from_stored_index() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("state.json"), r#"{"mode":"work","lastBreakIndex":2}"#).unwrap();
        let mut machine = machine(&dir, &["A", "B", "C"]);
        let tracker = MockTracker::new([]);

        let outcome = machine.advance(&tracker).await.unwrap();

        assert_eq!(outcome.state.mode, SessionMode::Break);
        assert_eq!(outcome.state.last_break_index, 0);
        assert_eq!(outcome.report.message(), "A");
    }

    #[tokio::test]
    async fn test_alternates_modes() {
        let dir = TempDir::new().unwrap();
        let mut machine = machine(&dir, &["A", "B"]);
        let tracker = MockTracker::new([issue(1, &[], "2023-05-01")]);

        let modes: Vec<SessionMode> = {
            let mut modes = Vec::new();
            for _ in 0..4 {
                modes.push(machine.advance(&tracker).await.unwrap().state.mode);
            }
            modes
        };

        assert_eq!(
            modes,
            vec![SessionMode::Work, SessionMode::Break, SessionMode::Work, SessionMode::Break]
        );
        assert_eq!(machine.current().last_break_index, 1);
    }

    #[tokio::test]
    async fn test_empty_suggestion_list_reports_sentinel() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("state.json"), r#"{"mode":"work","lastBreakIndex":-1}"#).unwrap();
        let mut machine = machine(&dir, &[]);

        let outcome = machine.advance(&MockTracker::new([])).await.unwrap();

        assert_eq!(outcome.report, SessionReport::Break { suggestion: None });
        assert_eq!(outcome.report.message(), NO_SUGGESTIONS_MESSAGE);
        assert_eq!(outcome.state.last_break_index, -1);
    }

    #[tokio::test]
    async fn test_no_open_issues() {
        let dir = TempDir::new().unwrap();
        let mut machine = machine(&dir, &["A"]);

        let outcome = machine.advance(&MockTracker::new([])).await.unwrap();

        assert_eq!(outcome.report, SessionReport::Work { issue: None });
        assert_eq!(outcome.report.message(), "No open issues");
    }

    #[tokio::test]
    async fn test_write_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        // Directory in place of the state file: reads and writes both fail
        fs::create_dir(dir.path().join("state.json")).unwrap();
        let mut machine = machine(&dir, &["A", "B"]);
        let tracker = MockTracker::new([]);

        let first = machine.advance(&tracker).await.unwrap();
        assert!(!first.persisted);
        assert_eq!(first.state.mode, SessionMode::Work);

        // The in-memory copy carries the session forward
        let second = machine.advance(&tracker).await.unwrap();
        assert_eq!(second.state.mode, SessionMode::Break);
        assert_eq!(second.report.message(), "A");
        assert_eq!(machine.context().fallback().map(|s| s.mode), Some(SessionMode::Break));
    }

    #[tokio::test]
    async fn test_fetch_failure_after_state_saved() {
        let dir = TempDir::new().unwrap();
        let mut machine = machine(&dir, &["A"]);
        let tracker = MockTracker::new([]);
        tracker.fail_next_list(TriageError::Api {
            status: 503,
            message: "down".to_string(),
        });

        let err = machine.advance(&tracker).await.unwrap_err();

        assert!(matches!(err, TriageError::FetchFailed(_)));
        assert_eq!(machine.current().mode, SessionMode::Work);
    }

    #[test]
    fn test_report_message_includes_link() {
        let report = SessionReport::Work {
            issue: Some(issue(12, &[], "2023-01-01")),
        };
        assert_eq!(
            report.message(),
            "Work on #12 Issue 12: https://github.com/o/r/issues/12"
        );
        assert_eq!(report.mode(), SessionMode::Work);
    }
}
