//! Batch labeling - classify every issue and apply the labels it earns.
//!
//! Issues are handled one at a time with a fixed pause between them. A failure
//! on one issue is recorded in the summary and the batch moves on; nothing in
//! here ends the loop early.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;

use crate::classify::Classifier;
use crate::domain::{AllowedLabelSet, Issue};
use crate::error::TriageError;
use crate::prompt::PromptRenderer;
use crate::tracker::IssueTracker;

/// Default pause between two issues
pub const DEFAULT_BATCH_DELAY_MS: u64 = 1000;

/// Why an issue ended up where it did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeReason {
    LabelsApplied,
    SkippedNoAllowedLabels,
    SkippedAlreadyLabeled,
    RateLimitExceeded,
    /// Any other failure, with its message
    Error(String),
}

impl OutcomeReason {
    pub fn as_str(&self) -> &str {
        match self {
            OutcomeReason::LabelsApplied => "labels_applied",
            OutcomeReason::SkippedNoAllowedLabels => "skipped_no_allowed_labels",
            OutcomeReason::SkippedAlreadyLabeled => "skipped_already_labeled",
            OutcomeReason::RateLimitExceeded => "rate_limit_exceeded",
            OutcomeReason::Error(message) => message,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeReason::RateLimitExceeded | OutcomeReason::Error(_))
    }

    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            OutcomeReason::SkippedNoAllowedLabels | OutcomeReason::SkippedAlreadyLabeled
        )
    }

    fn from_error(error: &TriageError) -> Self {
        if error.is_rate_limit() {
            OutcomeReason::RateLimitExceeded
        } else {
            OutcomeReason::Error(error.to_string())
        }
    }
}

impl fmt::Display for OutcomeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result for one issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueOutcome {
    pub number: u64,
    pub reason: OutcomeReason,
    /// Labels applied (or that would have been, in a dry run)
    pub labels: Vec<String>,
}

impl IssueOutcome {
    fn new(number: u64, reason: OutcomeReason) -> Self {
        Self {
            number,
            reason,
            labels: Vec::new(),
        }
    }
}

/// Totals for a batch run. `success + failed == total` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub labeled: usize,
    pub skipped: usize,
    /// Nothing was written to the tracker
    pub dry_run: bool,
    pub outcomes: Vec<IssueOutcome>,
}

impl BatchSummary {
    fn record(&mut self, outcome: IssueOutcome) {
        self.total += 1;
        if outcome.reason.is_failure() {
            self.failed += 1;
        } else {
            self.success += 1;
            if outcome.reason.is_skip() {
                self.skipped += 1;
            } else {
                self.labeled += 1;
            }
        }
        self.outcomes.push(outcome);
    }
}

/// Classifies issues and applies the allowed labels through the tracker
pub struct Labeler {
    classifier: Classifier,
    tracker: Arc<dyn IssueTracker>,
    allowed: AllowedLabelSet,
    renderer: PromptRenderer,
    delay: Duration,
    dry_run: bool,
}

impl Labeler {
    pub fn new(classifier: Classifier, tracker: Arc<dyn IssueTracker>, allowed: AllowedLabelSet) -> Self {
        Self {
            classifier,
            tracker,
            allowed,
            renderer: PromptRenderer::default(),
            delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            dry_run: false,
        }
    }

    pub fn with_renderer(mut self, renderer: PromptRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Label every issue in order and summarize.
    pub async fn label_all(&self, issues: &[Issue]) -> BatchSummary {
        let mut summary = BatchSummary {
            dry_run: self.dry_run,
            ..Default::default()
        };

        for (i, issue) in issues.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let outcome = self.label_one(issue).await;
            info!("Issue #{}: {}", issue.number, outcome.reason);
            summary.record(outcome);
        }

        info!(
            "Batch finished: total={} success={} failed={} labeled={} skipped={}",
            summary.total, summary.success, summary.failed, summary.labeled, summary.skipped
        );
        summary
    }

    async fn label_one(&self, issue: &Issue) -> IssueOutcome {
        let prompt = match self.renderer.render_issue(issue) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to render prompt for #{}: {}", issue.number, e);
                return IssueOutcome::new(issue.number, OutcomeReason::from_error(&e));
            }
        };

        let classification = match self.classifier.classify(&prompt).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Classification failed for #{}: {}", issue.number, e);
                return IssueOutcome::new(issue.number, OutcomeReason::from_error(&e));
            }
        };

        let allowed = self.allowed.filter(classification.labels());
        if allowed.is_empty() {
            debug!("#{}: no allowed labels in {:?}", issue.number, classification);
            return IssueOutcome::new(issue.number, OutcomeReason::SkippedNoAllowedLabels);
        }

        let new_labels: Vec<String> = allowed.into_iter().filter(|l| !issue.has_label(l)).collect();
        if new_labels.is_empty() {
            return IssueOutcome::new(issue.number, OutcomeReason::SkippedAlreadyLabeled);
        }

        if self.dry_run {
            info!("[dry-run] Would label #{} with {:?}", issue.number, new_labels);
        } else if let Err(e) = self.tracker.apply_labels(issue.number, &new_labels).await {
            warn!("Failed to label #{}: {}", issue.number, e);
            return IssueOutcome::new(issue.number, OutcomeReason::from_error(&e));
        }

        IssueOutcome {
            number: issue.number,
            reason: OutcomeReason::LabelsApplied,
            labels: new_labels,
        }
    }
}
