//! Session mode and the persisted session record.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Work or break. There are no other states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Work,
    #[default]
    Break,
}

impl SessionMode {
    pub fn toggled(self) -> Self {
        match self {
            SessionMode::Work => SessionMode::Break,
            SessionMode::Break => SessionMode::Work,
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Work => write!(f, "work"),
            SessionMode::Break => write!(f, "break"),
        }
    }
}

/// The single persisted record: `{"mode": "...", "lastBreakIndex": n}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub mode: SessionMode,

    /// Index of the break suggestion shown last, -1 before the first break
    #[serde(default = "no_break_yet")]
    pub last_break_index: i64,
}

fn no_break_yet() -> i64 {
    -1
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            mode: SessionMode::Break,
            last_break_index: no_break_yet(),
        }
    }
}

impl SessionState {
    /// Clamp an out-of-range stored index back to "no break yet".
    pub fn sanitized(mut self) -> Self {
        if self.last_break_index < -1 {
            self.last_break_index = -1;
        }
        self
    }

    /// Move the suggestion pointer one step, wrapping at `len`.
    ///
    /// Returns the new index, or None (pointer untouched) when there are no
    /// suggestions to point at.
    pub fn advance_break(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        // An index at i64::MAX starts the list over
        let next = self
            .last_break_index
            .max(-1)
            .checked_add(1)
            .unwrap_or(0)
            .rem_euclid(len as i64);
        self.last_break_index = next;
        Some(next as usize)
    }
}
