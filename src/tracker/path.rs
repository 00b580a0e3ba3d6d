//! Validation of identifiers interpolated into request paths.

use crate::error::{Result, TriageError};

/// GitHub caps owner and repository names well below this
const MAX_SEGMENT_LEN: usize = 100;

/// Check that `value` is safe to use as one URL path segment.
///
/// Only ASCII alphanumerics, `-`, `_` and `.` are accepted, and `.`/`..` are
/// rejected outright. Input is never rewritten.
pub fn validate_path_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TriageError::Validation(format!("{} must not be empty", kind)));
    }
    if value.len() > MAX_SEGMENT_LEN {
        return Err(TriageError::Validation(format!(
            "{} is longer than {} characters",
            kind, MAX_SEGMENT_LEN
        )));
    }
    if value == "." || value == ".." {
        return Err(TriageError::Validation(format!("{} must not be '{}'", kind, value)));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(TriageError::Validation(format!(
            "{} contains invalid character {:?}",
            kind, bad
        )));
    }
    Ok(())
}
