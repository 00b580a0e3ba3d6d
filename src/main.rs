use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use triage::batch::{BatchSummary, Labeler};
use triage::classify::Classifier;
use triage::config::Config;
use triage::domain::Issue;
use triage::llm::AnthropicClient;
use triage::prompt::PromptRenderer;
use triage::resolver::Resolver;
use triage::session::{SessionContext, SessionMachine, SessionMode, SessionOutcome, SessionStore};
use triage::tracker::{GithubTracker, IssueTracker};

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("triage")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("triage.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_tracker(config: &Config) -> Result<GithubTracker> {
    let (owner, name) = config.repository_slug()?;
    let token = config.github_token()?;
    let tracker = GithubTracker::new(
        &config.repository.api_base,
        owner,
        name,
        &token,
        config.http_timeout(),
        config.retry_policy(),
    )
    .context("Failed to create GitHub client")?;
    Ok(tracker)
}

fn build_labeler(config: &Config, tracker: Arc<dyn IssueTracker>, dry_run: bool) -> Result<Labeler> {
    let api_key = config.llm_api_key()?;
    let client = AnthropicClient::with_api_key(api_key, config.anthropic_config()).context("Failed to create LLM client")?;
    let classifier = Classifier::new(Arc::new(client)).with_max_tokens(config.llm.max_tokens);

    let renderer = match &config.batch.prompt_template {
        Some(template) => PromptRenderer::with_template(template).context("Invalid batch.prompt_template")?,
        None => PromptRenderer::default(),
    };

    Ok(Labeler::new(classifier, tracker, config.allowed_labels())
        .with_renderer(renderer)
        .with_delay(config.batch_delay())
        .with_dry_run(dry_run))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Next => handle_next_command(config).await,
        Commands::Session => handle_session_command(config).await,
        Commands::Label { dry_run, issue } => handle_label_command(config, *dry_run, *issue).await,
        Commands::Show { number } => handle_show_command(config, *number).await,
        Commands::Comment { number, body } => handle_comment_command(config, *number, body).await,
    }
}

async fn handle_next_command(config: &Config) -> Result<()> {
    let tracker = build_tracker(config)?;
    match Resolver::default().fetch_and_select(&tracker).await? {
        Some(issue) => print_issue_line(&issue),
        None => println!("{}", "No open issues".green()),
    }
    Ok(())
}

async fn handle_session_command(config: &Config) -> Result<()> {
    let tracker = build_tracker(config)?;
    let store = SessionStore::new(config.state_file());
    let mut machine = SessionMachine::new(SessionContext::new(store), config.session.break_suggestions.clone());

    let outcome = machine.advance(&tracker).await?;
    print_session_outcome(&outcome);
    Ok(())
}

async fn handle_label_command(config: &Config, dry_run: bool, only: Option<u64>) -> Result<()> {
    let tracker: Arc<dyn IssueTracker> = Arc::new(build_tracker(config)?);
    let labeler = build_labeler(config, tracker.clone(), dry_run)?;

    let issues = match only {
        Some(number) => vec![
            tracker
                .get_issue(number)
                .await
                .context(format!("Failed to fetch issue #{}", number))?,
        ],
        None => tracker.list_open_issues().await.context("Failed to list open issues")?,
    };

    info!("Labeling {} issue(s) (dry run: {})", issues.len(), dry_run);
    let summary = labeler.label_all(&issues).await;
    print_batch_summary(&summary);
    Ok(())
}

async fn handle_show_command(config: &Config, number: u64) -> Result<()> {
    let tracker = build_tracker(config)?;
    let issue = tracker
        .get_issue(number)
        .await
        .context(format!("Failed to fetch issue #{}", number))?;

    print_issue_line(&issue);
    if !issue.labels.is_empty() {
        let labels: Vec<&str> = issue.labels.iter().map(String::as_str).collect();
        println!("  {} {}", "Labels:".cyan(), labels.join(", "));
    }
    if let Some(updated_at) = &issue.updated_at {
        println!("  {} {}", "Updated:".cyan(), updated_at);
    }
    if !issue.body.trim().is_empty() {
        println!();
        println!("{}", issue.body.trim());
    }
    Ok(())
}

async fn handle_comment_command(config: &Config, number: u64, body: &str) -> Result<()> {
    let tracker = build_tracker(config)?;
    tracker
        .comment(number, body)
        .await
        .context(format!("Failed to comment on issue #{}", number))?;
    println!("{} #{}", "Commented on".green(), number);
    Ok(())
}

fn print_issue_line(issue: &Issue) {
    println!("{} {}", format!("#{}", issue.number).bold(), issue.title);
    if !issue.html_url.is_empty() {
        println!("  {}", issue.html_url.dimmed());
    }
}

fn print_session_outcome(outcome: &SessionOutcome) {
    let heading = match outcome.state.mode {
        SessionMode::Work => "Work session".green().bold(),
        SessionMode::Break => "Break time".cyan().bold(),
    };
    println!("{}: {}", heading, outcome.report.message());
    if !outcome.persisted {
        println!("{}", "Warning: session state could not be saved".yellow());
    }
}

fn print_batch_summary(summary: &BatchSummary) {
    let marker = if summary.dry_run { " (dry run)" } else { "" };
    for outcome in &summary.outcomes {
        let reason = if outcome.reason.is_failure() {
            outcome.reason.as_str().red()
        } else if outcome.reason.is_skip() {
            outcome.reason.as_str().yellow()
        } else {
            outcome.reason.as_str().green()
        };
        if outcome.labels.is_empty() {
            println!("#{} {}", outcome.number, reason);
        } else {
            println!("#{} {} [{}]{}", outcome.number, reason, outcome.labels.join(", "), marker);
        }
    }
    println!(
        "{}{}: total={} success={} failed={} labeled={} skipped={}",
        "Summary".bold(),
        marker,
        summary.total,
        summary.success,
        summary.failed,
        summary.labeled,
        summary.skipped
    );
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.is_verbose()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    // Run the main application logic
    runtime.block_on(run_application(&cli, &config)).context("Application failed")?;

    Ok(())
}
