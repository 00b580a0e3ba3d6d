//! End-to-end triage flows
//!
//! Drives the resolver, session machine and labeler against the in-memory
//! tracker and scripted LLM client, plus one pass over a mocked GitHub API.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use triage::batch::{Labeler, OutcomeReason};
use triage::classify::Classifier;
use triage::config::Config;
use triage::domain::{AllowedLabelSet, Issue};
use triage::error::Result;
use triage::llm::MockLlmClient;
use triage::resolver::{Resolver, select_next};
use triage::retry::RetryPolicy;
use triage::session::{SessionContext, SessionMachine, SessionMode, SessionReport, SessionStore};
use triage::tracker::{GithubTracker, IssueTracker, MockTracker};

fn issue(number: u64, labels: &[&str], updated_at: &str) -> Issue {
    Issue::new(number, format!("Issue {}", number))
        .with_labels(labels.iter().copied())
        .with_updated_at(updated_at)
        .with_html_url(format!("https://github.com/acme/widgets/issues/{}", number))
}

/// Labeling first, then asking for the next issue, picks up the new labels
#[tokio::test]
async fn test_labels_feed_next_selection() -> Result<()> {
    let issues = vec![
        issue(101, &[], "2023-05-01"),
        issue(102, &[], "2023-06-01"),
        issue(103, &[], "2023-07-01"),
    ];
    let tracker = Arc::new(MockTracker::new(issues.clone()));
    let llm = Arc::new(MockLlmClient::new());
    llm.push_response(r#"{"urgency": null, "importance": null}"#);
    llm.push_response("```json\n{\"urgency\": \"urgent\", \"importance\": \"important\"}\n```");
    llm.push_response(r#"{"urgency": "urgent", "importance": null}"#);

    assert_eq!(select_next(&issues).map(|i| i.number), Some(101));

    let labeler = Labeler::new(Classifier::new(llm.clone()), tracker.clone(), AllowedLabelSet::default())
        .with_delay(Duration::ZERO);
    let summary = labeler.label_all(&issues).await;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.labeled, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.outcomes[0].reason, OutcomeReason::SkippedNoAllowedLabels);

    let next = Resolver::default().fetch_and_select(tracker.as_ref()).await?;
    assert_eq!(next.map(|i| i.number), Some(102));
    Ok(())
}

/// A full work/break cycle across two machines sharing one state file
#[tokio::test]
async fn test_session_survives_restart() -> Result<()> {
    let dir = TempDir::new()?;
    let state_file = dir.path().join("session.json");
    let tracker = MockTracker::new([issue(1, &["important"], "2023-01-02"), issue(2, &[], "2023-01-01")]);
    let suggestions = vec!["Stretch".to_string(), "Walk".to_string()];

    let mut first = SessionMachine::new(SessionContext::new(SessionStore::new(&state_file)), suggestions.clone());
    let work = first.advance(&tracker).await?;
    assert_eq!(work.state.mode, SessionMode::Work);
    assert_eq!(work.report, SessionReport::Work { issue: tracker.issue(1) });

    let brk = first.advance(&tracker).await?;
    assert_eq!(brk.report.message(), "Stretch");

    // New process, same file
    let mut second = SessionMachine::new(SessionContext::new(SessionStore::new(&state_file)), suggestions);
    assert_eq!(second.current().mode, SessionMode::Break);
    second.advance(&tracker).await?;
    let brk = second.advance(&tracker).await?;
    assert_eq!(brk.report.message(), "Walk");
    assert_eq!(brk.state.last_break_index, 1);

    second.advance(&tracker).await?;
    let wrapped = second.advance(&tracker).await?;
    assert_eq!(wrapped.report.message(), "Stretch");
    assert_eq!(wrapped.state.last_break_index, 0);
    Ok(())
}

/// Config-driven wiring against a mocked GitHub API
#[tokio::test]
async fn test_config_driven_next_against_github() -> Result<()> {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/acme/widgets/issues")
                .query_param("state", "open")
                .header("authorization", "Bearer test-token");
            then.status(200).json_body(json!([
                {
                    "number": 5,
                    "title": "Old bug",
                    "body": null,
                    "labels": [],
                    "updated_at": "2022-01-01T00:00:00Z",
                    "html_url": "https://github.com/acme/widgets/issues/5"
                },
                {
                    "number": 6,
                    "title": "Pager is down",
                    "body": "prod",
                    "labels": [{"name": "URGENT"}],
                    "updated_at": "2023-03-01T00:00:00Z",
                    "html_url": "https://github.com/acme/widgets/issues/6"
                },
                {
                    "number": 7,
                    "title": "A pull request",
                    "labels": [{"name": "urgent"}],
                    "updated_at": "2020-01-01T00:00:00Z",
                    "html_url": "https://github.com/acme/widgets/pull/7",
                    "pull_request": {"url": "https://api.github.com/repos/acme/widgets/pulls/7"}
                }
            ]));
        })
        .await;

    let yaml = format!(
        "repository:\n  owner: acme\n  name: widgets\n  api_base: {}\nretry:\n  attempts: 1\n",
        server.base_url()
    );
    let config = Config::from_yaml(&yaml)?;
    let (owner, name) = config.repository_slug()?;
    let tracker = GithubTracker::new(
        &config.repository.api_base,
        owner,
        name,
        "test-token",
        config.http_timeout(),
        RetryPolicy::new(config.retry.attempts, Duration::from_millis(1)),
    )?;

    let open = tracker.list_open_issues().await?;
    assert_eq!(open.len(), 2);

    let next = Resolver::default().fetch_and_select(&tracker).await?;
    let next = next.expect("an issue should be selected");
    assert_eq!(next.number, 6);
    assert!(next.has_label("urgent"));
    assert_eq!(list.calls(), 2);
    Ok(())
}
