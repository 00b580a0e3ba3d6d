//! Triage - issue triage helper
//!
//! Picks the one open issue that matters right now, cycles work/break
//! sessions around it, and labels issues by urgency and importance with an LLM.

pub mod batch;
pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod tracker;

pub use error::{Result, TriageError};
