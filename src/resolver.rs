//! Priority resolver - picks the one issue to work on next.
//!
//! Selection is a cascade of label filters followed by a tie-break:
//! - Each stage narrows the working set to issues carrying its label, but only
//!   when at least one issue matches. A stage with no matches is a no-op, so
//!   the working set is never emptied.
//! - The survivors are sorted by `updated_at`, oldest first, with a stable sort
//!   so equal timestamps keep input order. Issues with a missing or unparseable
//!   timestamp sort after every dated issue.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::domain::{IMPORTANT_LABEL, Issue, URGENT_LABEL, normalize_label};
use crate::error::{Result, TriageError};
use crate::tracker::IssueTracker;

/// One narrowing step of the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelStage {
    label: String,
}

impl LabelStage {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self {
            label: normalize_label(label.as_ref()),
        }
    }

    /// Keep only matching issues, unless nothing matches.
    fn narrow<'a>(&self, working: Vec<&'a Issue>) -> Vec<&'a Issue> {
        if self.label.is_empty() {
            warn!("Skipping cascade stage with a blank label");
            return working;
        }

        let matched: Vec<&Issue> = working.iter().copied().filter(|i| i.labels.contains(&self.label)).collect();
        if matched.is_empty() {
            debug!("No candidates labelled '{}', stage skipped", self.label);
            working
        } else {
            debug!("{} of {} candidates labelled '{}'", matched.len(), working.len(), self.label);
            matched
        }
    }
}

/// Cascade of label stages plus the oldest-first tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    stages: Vec<LabelStage>,
}

impl Default for Resolver {
    /// `urgent`, then `important`
    fn default() -> Self {
        Self::with_stages([URGENT_LABEL, IMPORTANT_LABEL])
    }
}

impl Resolver {
    pub fn with_stages(labels: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            stages: labels.into_iter().map(|l| LabelStage::new(l)).collect(),
        }
    }

    /// Pick the next issue, or None when there are no issues at all.
    pub fn select_next<'a>(&self, issues: &'a [Issue]) -> Option<&'a Issue> {
        if issues.is_empty() {
            return None;
        }

        let working = self
            .stages
            .iter()
            .fold(issues.iter().collect::<Vec<_>>(), |working, stage| stage.narrow(working));

        oldest_first(working).into_iter().next()
    }

    /// List open issues from the tracker and select one.
    ///
    /// Tracker failures come back as `TriageError::FetchFailed`.
    pub async fn fetch_and_select(&self, tracker: &dyn IssueTracker) -> Result<Option<Issue>> {
        let issues = tracker
            .list_open_issues()
            .await
            .map_err(|e| TriageError::FetchFailed(Box::new(e)))?;
        Ok(self.select_next(&issues).cloned())
    }
}

/// Select with the default cascade.
pub fn select_next(issues: &[Issue]) -> Option<&Issue> {
    Resolver::default().select_next(issues)
}

/// Stable ascending sort on the parsed timestamp; undated issues go last.
fn oldest_first(working: Vec<&Issue>) -> Vec<&Issue> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &Issue)> = working
        .into_iter()
        .map(|issue| {
            let ts = issue.updated_timestamp();
            if ts.is_none() {
                warn!(
                    "Issue #{} has missing or unparseable updated_at {:?}",
                    issue.number, issue.updated_at
                );
            }
            (ts, issue)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed.into_iter().map(|(_, issue)| issue).collect()
}
