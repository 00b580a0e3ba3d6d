//! CLI module for triage - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for picking the next issue,
//! cycling sessions, batch labeling and a few single-issue helpers.

pub mod commands;

pub use commands::Cli;
