//! Label normalization and the allow-list of labels the tool may apply.

use std::collections::BTreeSet;

pub const URGENT_LABEL: &str = "urgent";
pub const IMPORTANT_LABEL: &str = "important";

/// Used when the configured allow-list is empty and `allow_any` is off.
pub const DEFAULT_ALLOWED_LABELS: &[&str] = &[URGENT_LABEL, IMPORTANT_LABEL];

/// Canonical form of a label name: trimmed, lowercase.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Labels the tool is permitted to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedLabelSet {
    /// Legacy mode: apply whatever the model suggests
    Any,
    /// Only these (normalized) labels
    Only(BTreeSet<String>),
}

impl AllowedLabelSet {
    /// Build from configuration.
    ///
    /// A non-empty list wins. An empty list means "anything" when the legacy
    /// flag is set and the default set otherwise.
    pub fn from_config(labels: &[String], allow_any: bool) -> Self {
        let configured: BTreeSet<String> = labels
            .iter()
            .map(|l| normalize_label(l))
            .filter(|l| !l.is_empty())
            .collect();

        if !configured.is_empty() {
            return Self::Only(configured);
        }
        if allow_any {
            return Self::Any;
        }
        Self::Only(DEFAULT_ALLOWED_LABELS.iter().map(|l| l.to_string()).collect())
    }

    pub fn permits(&self, label: &str) -> bool {
        let label = normalize_label(label);
        if label.is_empty() {
            return false;
        }
        match self {
            Self::Any => true,
            Self::Only(set) => set.contains(&label),
        }
    }

    /// Normalized, de-duplicated subset of `candidates` that may be applied,
    /// in candidate order.
    pub fn filter<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut kept: Vec<String> = Vec::new();
        for candidate in candidates {
            let label = normalize_label(candidate);
            if self.permits(&label) && !kept.contains(&label) {
                kept.push(label);
            }
        }
        kept
    }
}

impl Default for AllowedLabelSet {
    fn default() -> Self {
        Self::from_config(&[], false)
    }
}
