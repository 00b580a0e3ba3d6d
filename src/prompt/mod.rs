//! Prompt System - classification prompt rendering
//!
//! Prompts are Handlebars templates rendered with the issue's number, title
//! and body.

mod render;

pub use render::{DEFAULT_CLASSIFY_TEMPLATE, PromptRenderer};
