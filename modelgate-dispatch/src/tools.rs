//! Tool registration and execution.
//!
//! [`ToolBox`] holds the registered [`ToolHandler`]s and implements the
//! [`ToolExecutor`] contract the orchestrator drives. Tool failures never
//! abort a request: they are reported back to the model as error results.

use async_trait::async_trait;
use modelgate_core::{AiRequest, AiResponse, Message, ModelDescriptor, ToolCall, ToolExecutor};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::error::ToolError;

// ============================================================================
// Tool Handler
// ============================================================================

/// Capability a model needs before any tool is offered to it.
pub const FUNCTION_CALLING: &str = "function_calling";

/// A tool the model may call.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &str;

    /// OpenAI-style function definition offered to the model.
    fn definition(&self) -> Value;

    /// Whether the tool may be offered to `model`.
    fn is_enabled_for(&self, model: &ModelDescriptor) -> bool {
        model.capabilities.has_tool(FUNCTION_CALLING)
    }

    /// Runs the tool.
    async fn call(&self, arguments: &Value) -> Result<Value, ToolError>;
}

// ============================================================================
// Tool Result
// ============================================================================

/// The outcome of one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Id of the call this answers.
    pub tool_call_id: String,
    /// Tool name.
    pub tool_name: String,
    /// Result payload shown to the model.
    pub result: Value,
    /// Whether the tool ran successfully.
    pub success: bool,
    /// Failure description for logs.
    pub error: Option<String>,
}

impl ToolResult {
    fn success(call: &ToolCall, result: Value) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            result,
            success: true,
            error: None,
        }
    }

    fn failure(call: &ToolCall, result: Value, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            result,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Converts the result into a `tool` message.
    pub fn to_message(&self) -> Message {
        let content = match &self.result {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Message::tool_result(&self.tool_call_id, &self.tool_name, content)
    }
}

// ============================================================================
// Tool Box
// ============================================================================

/// Registered tools, keyed by name.
#[derive(Clone, Default)]
pub struct ToolBox {
    handlers: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolBox {
    /// Creates an empty tool box.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing one with the same name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> &mut Self {
        self.handlers.insert(handler.name().to_string(), handler);
        self
    }

    /// Returns the registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Offers every registered tool on a request.
    #[must_use]
    pub fn offer(&self, mut request: AiRequest) -> AiRequest {
        request
            .tools
            .extend(self.handlers.values().map(|h| h.definition()));
        request
    }

    /// Returns the definitions of the tools enabled for `model`.
    pub fn definitions_for(&self, model: &ModelDescriptor) -> Vec<Value> {
        self.handlers
            .values()
            .filter(|h| h.is_enabled_for(model))
            .map(|h| h.definition())
            .collect()
    }

    /// Offers the tools enabled for `model` on a request.
    #[must_use]
    pub fn offer_for_model(&self, model: &ModelDescriptor, mut request: AiRequest) -> AiRequest {
        let definitions = self.definitions_for(model);
        debug!(model = %model.id, tools = definitions.len(), "Offering tools");
        request.tools.extend(definitions);
        request
    }

    /// Runs one tool call.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let Some(handler) = self.handlers.get(&call.name) else {
            error!(tool = %call.name, tool_call_id = %call.id, "Tool not found");
            return ToolResult::failure(
                call,
                json!({"error": "Tool not found"}),
                format!("Tool '{}' is not registered", call.name),
            );
        };

        match handler.call(&call.arguments).await {
            Ok(result) => {
                info!(tool = %call.name, tool_call_id = %call.id, "Tool executed successfully");
                ToolResult::success(call, result)
            }
            Err(e) => {
                error!(tool = %call.name, tool_call_id = %call.id, error = %e, "Tool execution failed");
                ToolResult::failure(call, json!({"error": e.to_string()}), e.to_string())
            }
        }
    }

    /// Runs tool calls in order.
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.execute(call).await);
        }
        results
    }
}

#[async_trait]
impl ToolExecutor for ToolBox {
    fn requires_tool_execution(&self, response: &AiResponse) -> bool {
        response.has_tool_calls() && response.is_done
    }

    #[instrument(skip_all, fields(tools = response.tool_calls.len(), disable_tools = disable_tools))]
    async fn build_follow_up_request(
        &self,
        request: &AiRequest,
        response: &AiResponse,
        disable_tools: bool,
    ) -> AiRequest {
        let mut follow_up = request.clone();

        let content = Some(response.content.clone()).filter(|c| !c.is_empty());
        follow_up
            .messages
            .push(Message::assistant_tool_calls(content, response.tool_calls.clone()));

        for result in self.execute_all(&response.tool_calls).await {
            follow_up.messages.push(result.to_message());
        }

        if disable_tools {
            follow_up.tools_disabled = true;
            follow_up.tools.clear();
        }
        follow_up
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use modelgate_core::{FinishReason, Role};

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn definition(&self) -> Value {
            json!({"type": "function", "function": {"name": "echo"}})
        }

        async fn call(&self, arguments: &Value) -> Result<Value, ToolError> {
            Ok(arguments.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl ToolHandler for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn definition(&self) -> Value {
            json!({"type": "function", "function": {"name": "broken"}})
        }

        fn is_enabled_for(&self, model: &ModelDescriptor) -> bool {
            model.capabilities.has_tool(FUNCTION_CALLING) && model.capabilities.has_tool("mcp")
        }

        async fn call(&self, _arguments: &Value) -> Result<Value, ToolError> {
            Err(ToolError::Failed("disk on fire".to_string()))
        }
    }

    fn toolbox() -> ToolBox {
        let mut tools = ToolBox::new();
        tools.register(Arc::new(Echo)).register(Arc::new(Broken));
        tools
    }

    #[test]
    fn test_requires_tool_execution() {
        let tools = toolbox();
        let call = ToolCall::new("1", "echo", json!({}));

        assert!(tools.requires_tool_execution(&AiResponse::tool_calls(vec![call.clone()])));

        let mut partial = AiResponse::chunk("");
        partial.tool_calls.push(call);
        assert!(!tools.requires_tool_execution(&partial));
        assert!(!tools.requires_tool_execution(&AiResponse::done("x", FinishReason::Stop)));
    }

    #[test]
    fn test_offer_adds_definitions() {
        let request = toolbox().offer(AiRequest::new(vec![Message::user("hi")]));
        assert_eq!(request.tools.len(), 2);
        assert!(request.offers_tools());
    }

    fn model_with_tools(tools: Value) -> ModelDescriptor {
        let mut model = ModelDescriptor::new("m", "p");
        model.capabilities.extra.insert("tools".to_string(), tools);
        model
    }

    #[test]
    fn test_offer_for_model_checks_capabilities() {
        let tools = toolbox();
        let request = || AiRequest::new(vec![Message::user("hi")]);

        let plain = ModelDescriptor::new("m", "p");
        assert!(tools.definitions_for(&plain).is_empty());
        assert!(!tools.offer_for_model(&plain, request()).offers_tools());

        let calling = model_with_tools(json!({"function_calling": true}));
        let offered = tools.offer_for_model(&calling, request());
        assert_eq!(offered.tools.len(), 1);
        assert_eq!(offered.tools[0]["function"]["name"], "echo");

        let mcp = model_with_tools(json!({"function_calling": "native", "mcp": "mcp"}));
        assert_eq!(tools.definitions_for(&mcp).len(), 2);

        let disabled = model_with_tools(json!({"function_calling": "unsupported"}));
        assert!(tools.definitions_for(&disabled).is_empty());
    }

    #[tokio::test]
    async fn test_follow_up_appends_assistant_and_results() {
        let tools = toolbox();
        let request = tools.offer(AiRequest::new(vec![Message::user("hi")]).with_model("m"));
        let response = AiResponse::tool_calls(vec![
            ToolCall::new("c1", "echo", json!({"x": 1})),
            ToolCall::new("c2", "missing", json!({})),
            ToolCall::new("c3", "broken", json!({})),
        ]);

        let follow_up = tools.build_follow_up_request(&request, &response, false).await;

        assert_eq!(follow_up.model.as_deref(), Some("m"));
        assert_eq!(follow_up.messages.len(), 5);
        assert_eq!(follow_up.messages[1].role, Role::Assistant);
        assert_eq!(follow_up.messages[1].tool_calls.len(), 3);
        assert!(follow_up.messages[1].content.is_none());

        let echo = &follow_up.messages[2];
        assert_eq!(echo.role, Role::Tool);
        assert_eq!(echo.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(echo.content.as_deref(), Some("{\"x\":1}"));

        assert_eq!(
            follow_up.messages[3].content.as_deref(),
            Some("{\"error\":\"Tool not found\"}")
        );
        assert_eq!(
            follow_up.messages[4].content.as_deref(),
            Some("{\"error\":\"disk on fire\"}")
        );
        assert!(follow_up.offers_tools());
    }

    #[tokio::test]
    async fn test_follow_up_can_disable_tools() {
        let tools = toolbox();
        let request = tools.offer(AiRequest::new(vec![Message::user("hi")]));
        let response = AiResponse::tool_calls(vec![ToolCall::new("c1", "echo", json!("ok"))]);

        let follow_up = tools.build_follow_up_request(&request, &response, true).await;
        assert!(follow_up.tools_disabled);
        assert!(follow_up.tools.is_empty());
        assert!(!follow_up.offers_tools());
        assert_eq!(follow_up.messages[2].content.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_missing_tool_result() {
        let result = toolbox()
            .execute(&ToolCall::new("c9", "nope", json!({})))
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Tool 'nope' is not registered"));
    }
}
