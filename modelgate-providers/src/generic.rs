//! Generic OpenAI-compatible client.
//!
//! Serves every adapter kind that speaks the chat completions dialect and
//! acts as the fallback adapter. HTTP and decoding failures are turned into
//! [`AiResponse::failure`] so callers never see an `Err`.

use async_trait::async_trait;
use modelgate_core::{
    AiRequest, AiResponse, ChunkSink, FinishReason, Message, ModelCapabilities, ModelClient,
    ModelDetails, ModelStatus, ProviderConfig, TokenUsage, ToolCall,
};
use reqwest::{Client, header};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::adapter::AdapterKind;
use crate::error::RegistryError;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Timeout of status probes in seconds.
const PING_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<PromptDetails>,
    #[serde(default)]
    completion_tokens_details: Option<CompletionDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct PromptDetails {
    #[serde(default)]
    cached_tokens: u64,
    #[serde(default)]
    audio_tokens: u64,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionDetails {
    #[serde(default)]
    reasoning_tokens: u64,
    #[serde(default)]
    audio_tokens: u64,
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

fn wire_message(message: &Message) -> Value {
    let mut out = Map::new();
    out.insert("role".to_string(), json!(message.role));
    out.insert(
        "content".to_string(),
        message.content.clone().map_or(Value::Null, Value::String),
    );
    if !message.tool_calls.is_empty() {
        let calls: Vec<Value> = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }
                })
            })
            .collect();
        out.insert("tool_calls".to_string(), Value::Array(calls));
    }
    if let Some(id) = &message.tool_call_id {
        out.insert("tool_call_id".to_string(), json!(id));
    }
    if let Some(name) = &message.name {
        out.insert("name".to_string(), json!(name));
    }
    Value::Object(out)
}

/// Builds the chat completions body for a request.
fn request_body(request: &AiRequest) -> Value {
    let mut body = request.options.clone();
    if let Some(model) = &request.model {
        body.insert("model".to_string(), json!(model));
    }
    body.insert(
        "messages".to_string(),
        Value::Array(request.messages.iter().map(wire_message).collect()),
    );
    if request.offers_tools() {
        body.insert("tools".to_string(), Value::Array(request.tools.clone()));
    } else {
        body.remove("tools");
        body.remove("tool_choice");
    }
    body.insert("stream".to_string(), Value::Bool(false));
    Value::Object(body)
}

/// Converts a decoded completion into a response.
fn into_response(completion: CompletionResponse, requested_model: Option<&str>) -> AiResponse {
    let Some(choice) = completion.choices.into_iter().next() else {
        return AiResponse::failure("Provider returned no choices");
    };

    let message = choice.message.unwrap_or(ChoiceMessage {
        content: None,
        tool_calls: Vec::new(),
    });
    let tool_calls: Vec<ToolCall> = message
        .tool_calls
        .into_iter()
        .map(|call| {
            let raw = call.function.arguments.unwrap_or_default();
            let arguments = if raw.trim().is_empty() {
                Value::Object(Map::new())
            } else {
                serde_json::from_str(&raw).unwrap_or(Value::String(raw))
            };
            ToolCall::new(call.id, call.function.name, arguments)
        })
        .collect();

    let finish_reason = match choice.finish_reason.as_deref() {
        Some(reason) => parse_finish_reason(reason),
        None if !tool_calls.is_empty() => FinishReason::ToolCalls,
        None => FinishReason::Stop,
    };

    let mut response = AiResponse::done(message.content.unwrap_or_default(), finish_reason);
    response.tool_calls = tool_calls;

    if let Some(wire) = completion.usage {
        let model = completion
            .model
            .or_else(|| requested_model.map(str::to_string))
            .unwrap_or_default();
        let prompt = wire.prompt_tokens_details.unwrap_or_default();
        let completion_details = wire.completion_tokens_details.unwrap_or_default();
        let mut usage = TokenUsage::new(model).with_tokens(wire.prompt_tokens, wire.completion_tokens);
        usage.cache_read_input_tokens = prompt.cached_tokens;
        usage.audio_input_tokens = prompt.audio_tokens;
        usage.reasoning_tokens = completion_details.reasoning_tokens;
        usage.audio_output_tokens = completion_details.audio_tokens;
        response = response.with_usage(usage);
    }

    response
}

// ============================================================================
// Generic Client
// ============================================================================

/// A [`ModelClient`] for OpenAI-compatible chat completion endpoints.
#[derive(Debug, Clone)]
pub struct GenericClient {
    config: ProviderConfig,
    http: Client,
}

impl GenericClient {
    /// Creates a client for one provider.
    pub fn new(config: ProviderConfig) -> Result<Self, RegistryError> {
        Self::with_timeout(config, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(config: ProviderConfig, timeout: Duration) -> Result<Self, RegistryError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("modelgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::ClientConstruction {
                kind: AdapterKind::Generic,
                provider: config.id.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { config, http })
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn complete(&self, request: &AiRequest) -> Result<AiResponse, String> {
        let url = self
            .config
            .api_url
            .as_deref()
            .ok_or_else(|| format!("Provider {} has no api_url", self.config.id))?;

        let mut call = self.http.post(url).json(&request_body(request));
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            call = call.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }

        debug!(url = %url, "Sending chat completion");
        let response = call.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status.as_u16(), body.trim()));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| format!("Invalid completion response: {e}"))?;
        Ok(into_response(completion, request.model.as_deref()))
    }
}

#[async_trait]
impl ModelClient for GenericClient {
    #[instrument(skip(self, request), fields(provider = %self.config.id))]
    async fn send_request(&self, request: &AiRequest) -> AiResponse {
        match self.complete(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "Chat completion failed");
                AiResponse::failure(error)
            }
        }
    }

    async fn send_stream_request(&self, request: &AiRequest, sink: &mut ChunkSink<'_>) {
        // No incremental decoding: the whole answer arrives as one terminal chunk.
        sink(self.send_request(request).await);
    }

    async fn status(&self, model_id: &str) -> ModelStatus {
        let Some(url) = self.config.ping_url.as_deref() else {
            return ModelStatus::Unknown;
        };

        let result = self
            .http
            .get(url)
            .timeout(Duration::from_secs(PING_TIMEOUT_SECS))
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => ModelStatus::Online,
            Ok(response) => {
                debug!(model = model_id, status = %response.status(), "Ping failed");
                ModelStatus::Offline
            }
            Err(e) => {
                debug!(model = model_id, error = %e, "Ping failed");
                ModelStatus::Offline
            }
        }
    }

    async fn model_details(&self, model_id: &str) -> ModelDetails {
        ModelDetails {
            id: model_id.to_string(),
            label: model_id.to_string(),
            status: self.status(model_id).await,
            capabilities: ModelCapabilities::default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use modelgate_core::ApiFormat;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GenericClient {
        let config = ProviderConfig::new("openai", ApiFormat::new("openai-api"))
            .with_api_url(format!("{}/v1/chat/completions", server.uri()))
            .with_api_key("sk-test");
        GenericClient::new(config).unwrap()
    }

    fn request() -> AiRequest {
        AiRequest::new(vec![Message::user("hi")]).with_model("gpt-4o")
    }

    #[test]
    fn test_request_body_drops_disabled_tools() {
        let mut req = request().with_tool(json!({"type": "function"}));
        assert!(request_body(&req).get("tools").is_some());

        req.tools_disabled = true;
        let body = request_body(&req);
        assert!(body.get("tools").is_none());
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_tool_call_arguments_are_serialized_as_strings() {
        let call = ToolCall::new("c1", "search", json!({"q": "rust"}));
        let msg = wire_message(&Message::assistant_tool_calls(None, vec![call]));
        assert_eq!(msg["tool_calls"][0]["function"]["arguments"], "{\"q\":\"rust\"}");
        assert!(msg["content"].is_null());
    }

    #[tokio::test]
    async fn test_send_request_parses_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header_eq("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o-2024",
                "choices": [{
                    "message": {"role": "assistant", "content": "Hello"},
                    "finish_reason": "stop"
                }],
                "usage": {
                    "prompt_tokens": 12,
                    "completion_tokens": 3,
                    "prompt_tokens_details": {"cached_tokens": 4},
                    "completion_tokens_details": {"reasoning_tokens": 1}
                }
            })))
            .mount(&server)
            .await;

        let response = client(&server).send_request(&request()).await;
        assert!(!response.is_error());
        assert!(response.is_done);
        assert_eq!(response.content, "Hello");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));

        let usage = response.usage.unwrap();
        assert_eq!(usage.model, "gpt-4o-2024");
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.cache_read_input_tokens, 4);
        assert_eq!(usage.reasoning_tokens, 1);
    }

    #[tokio::test]
    async fn test_send_request_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "search", "arguments": "{\"q\":\"x\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let response = client(&server).send_request(&request()).await;
        assert!(response.is_tool_call_completion());
        assert_eq!(response.tool_calls[0].name, "search");
        assert_eq!(response.tool_calls[0].arguments, json!({"q": "x"}));
    }

    #[tokio::test]
    async fn test_http_error_becomes_failure_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let response = client(&server).send_request(&request()).await;
        assert!(response.is_done);
        let error = response.error.unwrap();
        assert!(error.contains("500"));
        assert!(error.contains("upstream down"));
    }

    #[tokio::test]
    async fn test_missing_url_is_failure_response() {
        let config = ProviderConfig::new("bare", ApiFormat::new("openai-api"));
        let response = GenericClient::new(config).unwrap().send_request(&request()).await;
        assert!(response.error.unwrap().contains("no api_url"));
    }

    #[tokio::test]
    async fn test_stream_delivers_single_terminal_chunk() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "done"}, "finish_reason": "stop"}]
            })))
            .mount(&server)
            .await;

        let mut chunks = Vec::new();
        client(&server)
            .send_stream_request(&request(), &mut |chunk: AiResponse| chunks.push(chunk))
            .await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_done);
        assert_eq!(chunks[0].content, "done");
    }

    #[tokio::test]
    async fn test_status_uses_ping_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut config = ProviderConfig::new("p", ApiFormat::new("openai-api"));
        assert_eq!(
            GenericClient::new(config.clone()).unwrap().status("m").await,
            ModelStatus::Unknown
        );

        config.ping_url = Some(format!("{}/health", server.uri()));
        let client = GenericClient::new(config.clone()).unwrap();
        assert_eq!(client.status("m").await, ModelStatus::Online);

        config.ping_url = Some(format!("{}/missing", server.uri()));
        let client = GenericClient::new(config).unwrap();
        assert_eq!(client.status("m").await, ModelStatus::Offline);
    }
}
