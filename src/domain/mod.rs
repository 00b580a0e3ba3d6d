//! Domain types for triage
//!
//! This module contains the core domain types:
//! - Issue: One open issue as read from the tracker, labels already normalized
//! - AllowedLabelSet: Which model-suggested labels may be applied
//! - ClassificationResult: Urgency/importance verdict from the model
//! - StringOrAbsent: Coerced model field value

pub mod classification;
pub mod issue;
pub mod labels;

pub use classification::{ClassificationResult, StringOrAbsent};
pub use issue::Issue;
pub use labels::{AllowedLabelSet, DEFAULT_ALLOWED_LABELS, IMPORTANT_LABEL, URGENT_LABEL, normalize_label};
