//! Issue record
//!
//! An Issue is created from tracker data exactly once. Label names are
//! normalized at that point so every later comparison can assume lowercase.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::labels::normalize_label;

/// A single open issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Tracker-assigned number, the immutable key
    pub number: u64,

    pub title: String,

    /// Issue body (empty when the tracker has none)
    pub body: String,

    /// Normalized (lowercase, trimmed) label names
    pub labels: BTreeSet<String>,

    /// Raw last-updated timestamp as reported by the tracker
    pub updated_at: Option<String>,

    /// Browser link to the issue
    pub html_url: String,
}

impl Issue {
    /// Create an issue with no labels, body, timestamp or link
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: String::new(),
            labels: BTreeSet::new(),
            updated_at: None,
            html_url: String::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Add labels, normalizing each one. Blank names are dropped.
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.labels.extend(
            labels
                .into_iter()
                .map(|l| normalize_label(l.as_ref()))
                .filter(|l| !l.is_empty()),
        );
        self
    }

    pub fn with_updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = Some(updated_at.into());
        self
    }

    pub fn with_html_url(mut self, html_url: impl Into<String>) -> Self {
        self.html_url = html_url.into();
        self
    }

    /// Case-insensitive label check
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(&normalize_label(label))
    }

    /// Parse `updated_at` as RFC 3339, falling back to a bare `YYYY-MM-DD` date
    /// at midnight UTC. Returns None when absent or unparseable.
    pub fn updated_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.updated_at.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}
