//! Core LLM client types and trait definitions

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};

/// Stateless LLM client - each call is independent (fresh context)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Model identifier used for requests
    fn model(&self) -> &str;
}

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt
    pub system: String,

    /// Conversation, usually a single user message
    pub messages: Vec<Message>,

    /// Override for the client's configured max tokens
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: Vec::new(),
            max_tokens: None,
        }
    }

    pub fn with_user_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message {
            role: Role::User,
            content: content.into(),
        });
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Response from a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Text content, text blocks joined by newlines
    pub content: String,

    /// Token usage for the call
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Scripted client for tests: returns queued responses in order, then repeats
/// the fallback text.
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<String>>>,
    fallback: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::with_fallback(r#"{"urgency": null, "importance": null}"#)
    }

    pub fn with_fallback(fallback: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful text response
    pub fn push_response(&self, text: impl Into<String>) {
        self.lock_responses().push_back(Ok(text.into()));
    }

    /// Queue a rate-limit failure
    pub fn push_rate_limit(&self, retry_after: Duration) {
        self.lock_responses()
            .push_back(Err(TriageError::RateLimited { retry_after }));
    }

    /// Queue an arbitrary failure
    pub fn push_error(&self, error: TriageError) {
        self.lock_responses().push_back(Err(error));
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String>>> {
        self.responses.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let next = self.lock_responses().pop_front();
        let content = match next {
            Some(result) => result?,
            None => self.fallback.clone(),
        };
        Ok(CompletionResponse {
            content,
            usage: Usage::default(),
        })
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
