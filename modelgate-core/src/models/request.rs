//! Request-side types.
//!
//! - [`AiRequest`] - A chat request, optionally bound to a model id
//! - [`Message`] / [`Role`] - Conversation turns
//! - [`ToolCall`] - A provider-signaled request to run a tool

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

// ============================================================================
// Messages
// ============================================================================

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt.
    System,
    /// End user.
    User,
    /// The model.
    Assistant,
    /// Result of a tool call.
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id.
    pub id: String,
    /// Name of the tool to run.
    pub name: String,
    /// Arguments as decoded JSON.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// Creates a tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author.
    pub role: Role,

    /// Text content.
    #[serde(default)]
    pub content: Option<String>,

    /// Tool calls issued by an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Call id a tool turn answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool name for tool turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Creates an assistant message that carries tool calls.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
            name: None,
        }
    }

    /// Creates a tool result message.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
        }
    }
}

// ============================================================================
// AI Request
// ============================================================================

/// A chat request as it travels through the gateway.
///
/// The `model` field is the bound model id. Requests built from a raw
/// payload pick it up from the payload's `model` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiRequest {
    /// Bound model id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Conversation so far.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Tool definitions offered to the model, in provider-neutral JSON.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,

    /// Set once tools were explicitly switched off for this request.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tools_disabled: bool,

    /// Whether the caller wants a streamed answer.
    #[serde(default)]
    pub stream: bool,

    /// Everything else in the payload, passed through to the client.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl AiRequest {
    /// Creates an unbound request from messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Parses a raw JSON payload.
    pub fn from_payload(payload: Value) -> Result<Self, CoreError> {
        if !payload.is_object() {
            return Err(CoreError::InvalidData(
                "request payload must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(payload)?)
    }

    /// Binds the request to a model id.
    #[must_use]
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model = Some(model_id.into());
        self
    }

    /// Adds a tool definition.
    #[must_use]
    pub fn with_tool(mut self, definition: Value) -> Self {
        self.tools.push(definition);
        self
    }

    /// Returns true if the request offers tools to the model.
    pub fn offers_tools(&self) -> bool {
        !self.tools_disabled && !self.tools.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_keeps_unknown_keys() {
        let request = AiRequest::from_payload(json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.2
        }))
        .unwrap();

        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.options["temperature"], json!(0.2));
    }

    #[test]
    fn test_from_payload_without_model() {
        let request = AiRequest::from_payload(json!({"messages": []})).unwrap();
        assert!(request.model.is_none());
    }

    #[test]
    fn test_from_payload_rejects_non_object() {
        let result = AiRequest::from_payload(json!(["model", "gpt-4o"]));
        assert!(matches!(result, Err(CoreError::InvalidData(_))));
    }

    #[test]
    fn test_offers_tools() {
        let mut request = AiRequest::new(vec![Message::user("hi")]);
        assert!(!request.offers_tools());

        request = request.with_tool(json!({"name": "search"}));
        assert!(request.offers_tools());

        request.tools_disabled = true;
        assert!(!request.offers_tools());
    }
}
