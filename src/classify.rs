//! Label classifier - asks the model for an urgency/importance verdict.
//!
//! The model is told to answer with bare JSON, but it frequently wraps the
//! answer in a markdown fence. Parsing tries the whole response first and then
//! the first fenced block.

use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;

use crate::domain::ClassificationResult;
use crate::error::{Result, TriageError};
use crate::llm::{CompletionRequest, LlmClient};

/// System prompt used for every classification request
pub const CLASSIFIER_SYSTEM_PROMPT: &str = "You are an issue triage assistant. \
You answer only with a JSON object of the form {\"urgency\": string or null, \"importance\": string or null}.";

/// Classifies issue text through an LLM client
pub struct Classifier {
    client: Arc<dyn LlmClient>,
    max_tokens: Option<u32>,
}

impl Classifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Send one classification request for an already-rendered prompt
    pub async fn classify(&self, prompt_text: &str) -> Result<ClassificationResult> {
        let mut request = CompletionRequest::new(CLASSIFIER_SYSTEM_PROMPT).with_user_message(prompt_text);
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.client.complete(request).await?;
        debug!(
            "Classifier ({}) responded: {}",
            self.client.model(),
            truncate_for_log(&response.content, 200)
        );

        parse_classification(&response.content)
    }
}

/// Parse a model response into a ClassificationResult.
pub fn parse_classification(raw: &str) -> Result<ClassificationResult> {
    let value = parse_json_payload(raw).ok_or_else(|| {
        warn!("Classifier response is not JSON: {}", truncate_for_log(raw, 200));
        TriageError::Unparseable {
            message: "no JSON object found in response".to_string(),
            raw: raw.to_string(),
        }
    })?;

    ClassificationResult::from_json(&value).map_err(|e| match e {
        TriageError::Unparseable { message, .. } => TriageError::Unparseable {
            message,
            raw: raw.to_string(),
        },
        other => other,
    })
}

/// Direct parse, then the first fenced code block.
fn parse_json_payload(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    let fenced = extract_fenced_block(trimmed)?;
    serde_json::from_str::<Value>(fenced.trim()).ok()
}

/// Contents of the first ``` fenced block, skipping an optional language tag.
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];

    // The info string (e.g. "json") runs to the end of the opening line, or
    // up to the payload when the payload starts on that line
    let body_start = match after_fence.find('\n') {
        Some(newline) if !after_fence[..newline].contains('{') => newline + 1,
        _ => inline_tag_len(after_fence),
    };
    let body = &after_fence[body_start..];

    let end = body.find("```")?;
    Some(&body[..end])
}

/// Length of a leading word tag such as `json` in "json {...}".
fn inline_tag_len(text: &str) -> usize {
    if !text.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return 0;
    }
    text.len() - text.trim_start_matches(|c: char| c.is_ascii_alphanumeric()).len()
}

fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StringOrAbsent;
    use crate::llm::MockLlmClient;
    use std::time::Duration;

    #[test]
    fn test_parse_direct_json() {
        let result = parse_classification(r#"{"urgency": "urgent", "importance": "important"}"#).unwrap();
        assert_eq!(result.urgency.as_deref(), Some("urgent"));
        assert_eq!(result.importance.as_deref(), Some("important"));
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "Here is my answer:\n```json\n{\"urgency\": null, \"importance\": \"important\"}\n```\nThanks";
        let result = parse_classification(raw).unwrap();
        assert_eq!(result.urgency, StringOrAbsent::Absent);
        assert_eq!(result.importance.as_deref(), Some("important"));
    }

    #[test]
    fn test_parse_untagged_fence() {
        let raw = "```\n{\"urgency\": \"urgent\"}\n```";
        let result = parse_classification(raw).unwrap();
        assert_eq!(result.urgency.as_deref(), Some("urgent"));
        assert!(!result.importance.is_present());
    }

    #[test]
    fn test_parse_single_line_fence() {
        let raw = "```{\"urgency\": \"urgent\"}```";
        let result = parse_classification(raw).unwrap();
        assert_eq!(result.urgency.as_deref(), Some("urgent"));
    }

    #[test]
    fn test_parse_single_line_tagged_fence() {
        let raw = "```json {\"urgency\": \"urgent\", \"importance\": null}```";
        let result = parse_classification(raw).unwrap();
        assert_eq!(result.urgency.as_deref(), Some("urgent"));
        assert_eq!(extract_fenced_block("```json{}```"), Some("{}"));
    }

    #[test]
    fn test_parse_coerces_numbers() {
        let result = parse_classification(r#"{"urgency": 123, "importance": ""}"#).unwrap();
        assert_eq!(result.urgency.as_deref(), Some("123"));
        assert_eq!(result.importance, StringOrAbsent::Absent);
    }

    #[test]
    fn test_parse_failure_keeps_raw() {
        let raw = "I think this is urgent.";
        match parse_classification(raw) {
            Err(TriageError::Unparseable { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected Unparseable, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_non_object_keeps_raw() {
        let raw = "[\"urgent\"]";
        match parse_classification(raw) {
            Err(TriageError::Unparseable { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected Unparseable, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_fenced_block_missing_close() {
        assert!(extract_fenced_block("```json\n{}").is_none());
        assert!(extract_fenced_block("no fence").is_none());
    }

    #[tokio::test]
    async fn test_classify_sends_prompt() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_response(r#"{"urgency": "urgent", "importance": null}"#);
        let classifier = Classifier::new(mock.clone()).with_max_tokens(64);

        let result = classifier.classify("Issue #1: broken").await.unwrap();

        assert_eq!(result.labels(), vec!["urgent"]);
        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].content, "Issue #1: broken");
        assert_eq!(requests[0].max_tokens, Some(64));
    }

    #[tokio::test]
    async fn test_classify_propagates_api_error() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_error(TriageError::Api {
            status: 400,
            message: "bad request".to_string(),
        });
        let classifier = Classifier::new(mock);

        let err = classifier.classify("prompt").await.unwrap_err();
        assert!(matches!(err, TriageError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_classify_propagates_rate_limit() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_rate_limit(Duration::from_secs(30));
        let classifier = Classifier::new(mock);

        let err = classifier.classify("prompt").await.unwrap_err();
        assert!(err.is_rate_limit());
    }
}
