//! LLM Client Layer - Anthropic API integration
//!
//! This module provides:
//! - LlmClient trait for API abstraction
//! - Request/response types
//! - AnthropicClient implementation
//! - MockLlmClient for tests

pub mod anthropic;
pub mod client;

pub use anthropic::{ANTHROPIC_API_URL, AnthropicClient, AnthropicConfig, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
pub use client::{CompletionRequest, CompletionResponse, LlmClient, Message, MockLlmClient, Role, Usage};
