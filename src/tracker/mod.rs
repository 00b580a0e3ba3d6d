//! Issue tracker adapter
//!
//! This module provides:
//! - IssueTracker trait for the tracker operations the tool needs
//! - GithubTracker implementation over the GitHub REST API
//! - MockTracker for tests
//! - Path segment validation for repository coordinates

pub mod github;
pub mod path;

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{Issue, normalize_label};
use crate::error::{Result, TriageError};

pub use github::{GITHUB_API_BASE, GithubTracker};
pub use path::validate_path_segment;

/// Fields that may be changed with `update_issue`. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// "open" or "closed"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Replaces the full label set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.state.is_none() && self.labels.is_none()
    }
}

/// Operations on the external issue tracker.
///
/// Issues returned by `list_open_issues` and `get_issue` never include pull
/// requests and always carry normalized label names.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn list_open_issues(&self) -> Result<Vec<Issue>>;

    async fn get_issue(&self, number: u64) -> Result<Issue>;

    /// Add labels to an issue, keeping the ones it already has
    async fn apply_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    async fn update_issue(&self, number: u64, update: &IssueUpdate) -> Result<()>;

    async fn comment(&self, number: u64, body: &str) -> Result<()>;
}

/// In-memory tracker for tests.
///
/// Issues are listed in the order they were given. Failures can be scripted
/// per operation; every write is recorded.
#[derive(Default)]
pub struct MockTracker {
    issues: Mutex<Vec<Issue>>,
    list_error: Mutex<Option<TriageError>>,
    label_errors: Mutex<BTreeMap<u64, TriageError>>,
    applied: Mutex<Vec<(u64, Vec<String>)>>,
    comments: Mutex<Vec<(u64, String)>>,
}

impl MockTracker {
    pub fn new(issues: impl IntoIterator<Item = Issue>) -> Self {
        let tracker = Self::default();
        if let Ok(mut stored) = tracker.issues.lock() {
            stored.extend(issues);
        }
        tracker
    }

    /// Make the next `list_open_issues` call fail
    pub fn fail_next_list(&self, error: TriageError) {
        if let Ok(mut slot) = self.list_error.lock() {
            *slot = Some(error);
        }
    }

    /// Make `apply_labels` fail for one issue
    pub fn fail_labels_for(&self, number: u64, error: TriageError) {
        if let Ok(mut errors) = self.label_errors.lock() {
            errors.insert(number, error);
        }
    }

    /// Every successful `apply_labels` call, in order
    pub fn applied(&self) -> Vec<(u64, Vec<String>)> {
        self.applied.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.comments.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn issue(&self, number: u64) -> Option<Issue> {
        self.issues
            .lock()
            .ok()
            .and_then(|stored| stored.iter().find(|i| i.number == number).cloned())
    }

    fn not_found(number: u64) -> TriageError {
        TriageError::Api {
            status: 404,
            message: format!("issue #{} not found", number),
        }
    }
}

#[async_trait]
impl IssueTracker for MockTracker {
    async fn list_open_issues(&self) -> Result<Vec<Issue>> {
        if let Some(error) = self.list_error.lock().ok().and_then(|mut e| e.take()) {
            return Err(error);
        }
        Ok(self
            .issues
            .lock()
            .map(|stored| stored.clone())
            .unwrap_or_default())
    }

    async fn get_issue(&self, number: u64) -> Result<Issue> {
        self.issue(number).ok_or_else(|| Self::not_found(number))
    }

    async fn apply_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        if let Some(error) = self.label_errors.lock().ok().and_then(|mut e| e.remove(&number)) {
            return Err(error);
        }
        let mut issues = self
            .issues
            .lock()
            .map_err(|e| TriageError::Validation(e.to_string()))?;
        let issue = issues
            .iter_mut()
            .find(|i| i.number == number)
            .ok_or_else(|| Self::not_found(number))?;
        issue.labels.extend(labels.iter().map(|l| normalize_label(l)));
        drop(issues);

        if let Ok(mut applied) = self.applied.lock() {
            applied.push((number, labels.to_vec()));
        }
        Ok(())
    }

    async fn update_issue(&self, number: u64, update: &IssueUpdate) -> Result<()> {
        let mut issues = self
            .issues
            .lock()
            .map_err(|e| TriageError::Validation(e.to_string()))?;
        let issue = issues
            .iter_mut()
            .find(|i| i.number == number)
            .ok_or_else(|| Self::not_found(number))?;
        if let Some(title) = &update.title {
            issue.title = title.clone();
        }
        if let Some(body) = &update.body {
            issue.body = body.clone();
        }
        if let Some(labels) = &update.labels {
            issue.labels = labels.iter().map(|l| normalize_label(l)).collect();
        }
        if update.state.as_deref() == Some("closed") {
            issues.retain(|i| i.number != number);
        }
        Ok(())
    }

    async fn comment(&self, number: u64, body: &str) -> Result<()> {
        if self.issue(number).is_none() {
            return Err(Self::not_found(number));
        }
        if let Ok(mut comments) = self.comments.lock() {
            comments.push((number, body.to_string()));
        }
        Ok(())
    }
}
