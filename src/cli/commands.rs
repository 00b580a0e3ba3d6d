//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - next: print the issue to work on now
//! - session: toggle work/break
//! - label: classify and label open issues
//! - show / comment: single-issue helpers

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Triage - pick the issue that matters and keep it labeled
#[derive(Parser, Debug)]
#[command(name = "triage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the next issue to work on
    Next,

    /// Switch between work and break
    Session,

    /// Classify open issues and apply urgency/importance labels
    Label {
        /// Classify and report without writing labels
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Only label this issue
        #[arg(short, long)]
        issue: Option<u64>,
    },

    /// Print one issue
    Show {
        /// Issue number
        number: u64,
    },

    /// Post a comment on an issue
    Comment {
        /// Issue number
        number: u64,

        /// Comment text
        body: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["triage"]).is_err());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["triage", "-v", "next"]).unwrap();
        assert!(cli.is_verbose());
        assert!(matches!(cli.command, Commands::Next));
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["triage", "session", "-c", "/path/to/triage.yml"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/path/to/triage.yml")));
        assert!(matches!(cli.command, Commands::Session));
    }

    #[test]
    fn test_label_defaults() {
        let cli = Cli::try_parse_from(["triage", "label"]).unwrap();
        match cli.command {
            Commands::Label { dry_run, issue } => {
                assert!(!dry_run);
                assert!(issue.is_none());
            }
            _ => panic!("Expected label command"),
        }
    }

    #[test]
    fn test_label_dry_run_single_issue() {
        let cli = Cli::try_parse_from(["triage", "label", "--dry-run", "--issue", "42"]).unwrap();
        match cli.command {
            Commands::Label { dry_run, issue } => {
                assert!(dry_run);
                assert_eq!(issue, Some(42));
            }
            _ => panic!("Expected label command"),
        }
    }

    #[test]
    fn test_show_command() {
        let cli = Cli::try_parse_from(["triage", "show", "7"]).unwrap();
        match cli.command {
            Commands::Show { number } => assert_eq!(number, 7),
            _ => panic!("Expected show command"),
        }
    }

    #[test]
    fn test_show_rejects_non_number() {
        assert!(Cli::try_parse_from(["triage", "show", "seven"]).is_err());
    }

    #[test]
    fn test_comment_command() {
        let cli = Cli::try_parse_from(["triage", "comment", "3", "Looking into it"]).unwrap();
        match cli.command {
            Commands::Comment { number, body } => {
                assert_eq!(number, 3);
                assert_eq!(body, "Looking into it");
            }
            _ => panic!("Expected comment command"),
        }
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
