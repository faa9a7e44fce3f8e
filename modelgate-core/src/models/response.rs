//! Response-side types.
//!
//! - [`AiResponse`] - A full response or one streamed chunk
//! - [`TokenUsage`] - What a response consumed
//! - [`FinishReason`] / [`ResponseKind`]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::request::ToolCall;

// ============================================================================
// Finish Reason
// ============================================================================

/// Why the model stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of the answer.
    Stop,
    /// Output token limit reached.
    Length,
    /// The model asked for tool calls.
    ToolCalls,
    /// Output was filtered.
    ContentFilter,
    /// The call failed.
    Error,
}

/// Whether a chunk carries model content or a gateway status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// Model output.
    #[default]
    Content,
    /// Synthetic status emitted by the gateway.
    Status,
}

// ============================================================================
// Token Usage
// ============================================================================

/// Token and resource consumption of one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    /// Model that produced the usage.
    pub model: String,
    /// Prompt tokens.
    pub prompt_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
    /// Tokens read from the prompt cache.
    pub cache_read_input_tokens: u64,
    /// Tokens written to the prompt cache.
    pub cache_creation_input_tokens: u64,
    /// Reasoning tokens.
    pub reasoning_tokens: u64,
    /// Audio input tokens.
    pub audio_input_tokens: u64,
    /// Audio output tokens.
    pub audio_output_tokens: u64,
    /// Provider tool usage in the provider's own vocabulary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_tool_use: Option<BTreeMap<String, u64>>,
}

impl TokenUsage {
    /// Creates empty usage for a model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Sets prompt and completion counts.
    #[must_use]
    pub fn with_tokens(mut self, prompt: u64, completion: u64) -> Self {
        self.prompt_tokens = prompt;
        self.completion_tokens = completion;
        self
    }

    /// Adds one entry to the raw tool usage map.
    #[must_use]
    pub fn with_server_tool_use(mut self, key: impl Into<String>, count: u64) -> Self {
        self.server_tool_use
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), count);
        self
    }

    /// Returns prompt plus completion tokens.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

// ============================================================================
// AI Response
// ============================================================================

/// A full response, or a single chunk of a streamed one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    /// Text content.
    #[serde(default)]
    pub content: String,

    /// Usage, typically only on the terminal chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    /// Completion flag.
    #[serde(default)]
    pub is_done: bool,

    /// Provider-level failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Tool calls requested by the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Why the model stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,

    /// Content or status.
    #[serde(default, rename = "type")]
    pub kind: ResponseKind,

    /// Status text for status chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl AiResponse {
    /// Creates an in-progress content chunk.
    pub fn chunk(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Creates a terminal response.
    pub fn done(content: impl Into<String>, finish_reason: FinishReason) -> Self {
        Self {
            content: content.into(),
            is_done: true,
            finish_reason: Some(finish_reason),
            ..Self::default()
        }
    }

    /// Creates a terminal response that requests tool calls.
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            is_done: true,
            tool_calls,
            finish_reason: Some(FinishReason::ToolCalls),
            ..Self::default()
        }
    }

    /// Creates a gateway status chunk. Never completed.
    pub fn status(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Status,
            status_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Creates a terminal response carrying a provider failure.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            is_done: true,
            error: Some(error.into()),
            finish_reason: Some(FinishReason::Error),
            ..Self::default()
        }
    }

    /// Attaches usage.
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Returns true if the model requested tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Returns true for the terminal chunk of a round that stopped for tools.
    pub fn is_tool_call_completion(&self) -> bool {
        self.is_done && self.finish_reason == Some(FinishReason::ToolCalls)
    }

    /// Returns true for gateway status chunks.
    pub fn is_status(&self) -> bool {
        self.kind == ResponseKind::Status
    }

    /// Returns true if the response carries a provider failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================
