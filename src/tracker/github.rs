//! GitHub REST implementation of the issue tracker.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use super::path::validate_path_segment;
use super::{IssueTracker, IssueUpdate};
use crate::domain::Issue;
use crate::error::{Result, TriageError};
use crate::retry::{RetryPolicy, retry};

/// Public GitHub API
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const GITHUB_API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct GithubIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GithubLabel>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    pull_request: Option<Value>,
}

/// The issues API returns label objects; label endpoints accept plain names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GithubLabel {
    Named { name: String },
    Plain(String),
}

impl GithubLabel {
    fn name(&self) -> &str {
        match self {
            GithubLabel::Named { name } => name,
            GithubLabel::Plain(name) => name,
        }
    }
}

impl GithubIssue {
    fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    fn into_issue(self) -> Issue {
        let mut issue = Issue::new(self.number, self.title)
            .with_body(self.body.unwrap_or_default())
            .with_labels(self.labels.iter().map(GithubLabel::name))
            .with_html_url(self.html_url);
        issue.updated_at = self.updated_at;
        issue
    }
}

/// GitHub issues client for one repository
#[derive(Debug, Clone)]
pub struct GithubTracker {
    http: Client,
    api_base: String,
    owner: String,
    repo: String,
    retry: RetryPolicy,
}

impl GithubTracker {
    /// Create a client. Owner and repo are validated before anything is sent.
    pub fn new(
        api_base: &str,
        owner: &str,
        repo: &str,
        token: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        validate_path_segment("owner", owner)?;
        validate_path_segment("repo", repo)?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(concat!("triage/", env!("CARGO_PKG_VERSION"))));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(GITHUB_API_VERSION));
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| TriageError::Config("GitHub token contains invalid characters".to_string()))?;
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder().default_headers(headers).timeout(timeout).build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            retry,
        })
    }

    /// "owner/repo"
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/{}/issues", self.api_base, self.owner, self.repo)
    }

    fn issue_url(&self, number: u64) -> String {
        format!("{}/{}", self.issues_url(), number)
    }

    async fn fetch_page(&self, page: usize) -> Result<Vec<GithubIssue>> {
        let request = self.http.get(self.issues_url()).query(&[
            ("state", "open".to_string()),
            ("per_page", PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ]);
        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn fetch_issue(&self, number: u64) -> Result<GithubIssue> {
        let response = check_status(self.http.get(self.issue_url(number)).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_write(&self, operation: &str, request: RequestBuilder) -> Result<()> {
        debug!("GitHub {} on {}", operation, self.slug());
        check_status(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for GithubTracker {
    async fn list_open_issues(&self) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        let mut page = 1;
        loop {
            let chunk = retry(&self.retry, "list issues", || self.fetch_page(page)).await?;
            let chunk_len = chunk.len();
            issues.extend(
                chunk
                    .into_iter()
                    .filter(|i| !i.is_pull_request())
                    .map(GithubIssue::into_issue),
            );
            if chunk_len < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        info!("Fetched {} open issues from {}", issues.len(), self.slug());
        Ok(issues)
    }

    async fn get_issue(&self, number: u64) -> Result<Issue> {
        let raw = retry(&self.retry, "get issue", || self.fetch_issue(number)).await?;
        if raw.is_pull_request() {
            return Err(TriageError::Validation(format!("#{} is a pull request, not an issue", number)));
        }
        Ok(raw.into_issue())
    }

    async fn apply_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        let request = self
            .http
            .post(format!("{}/labels", self.issue_url(number)))
            .json(&json!({ "labels": labels }));
        self.send_write("add labels", request).await
    }

    async fn update_issue(&self, number: u64, update: &IssueUpdate) -> Result<()> {
        if update.is_empty() {
            return Err(TriageError::Validation("issue update has no fields".to_string()));
        }
        let request = self.http.patch(self.issue_url(number)).json(update);
        self.send_write("update issue", request).await
    }

    async fn comment(&self, number: u64, body: &str) -> Result<()> {
        if body.trim().is_empty() {
            return Err(TriageError::Validation("comment body is empty".to_string()));
        }
        let request = self
            .http
            .post(format!("{}/comments", self.issue_url(number)))
            .json(&json!({ "body": body }));
        self.send_write("create comment", request).await
    }
}

/// Map rate limits and other non-success statuses to errors.
///
/// GitHub signals an exhausted primary quota with 403 and
/// `x-ratelimit-remaining: 0`; that is treated the same as 429.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers();
    let quota_exhausted = status.as_u16() == 403 && header_str(headers, "x-ratelimit-remaining") == Some("0");
    if status.as_u16() == 429 || quota_exhausted {
        let retry_after = parse_retry_after(headers).unwrap_or(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS));
        return Err(TriageError::RateLimited { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    Err(TriageError::Api {
        status: status.as_u16(),
        message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// `retry-after` in seconds, else time until `x-ratelimit-reset` (epoch seconds).
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(secs) = header_str(headers, "retry-after").and_then(|s| s.parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }
    let reset = header_str(headers, "x-ratelimit-reset")?.parse::<i64>().ok()?;
    let wait = reset.saturating_sub(Utc::now().timestamp()).max(0);
    Some(Duration::from_secs(wait as u64))
}
