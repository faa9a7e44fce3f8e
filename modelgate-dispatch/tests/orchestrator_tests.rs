//! Integration tests for the tool-round loop.
//!
//! A scripted client stands in for a provider; it is wired in through the
//! adapter table so requests take the real catalog path.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use modelgate_core::{
    AiRequest, AiResponse, ApiFormat, ChunkSink, FinishReason, Message, ModelClient,
    ModelDescriptor, ModelDetails, ModelStatus, ProviderConfig, Role, ToolCall,
};
use modelgate_dispatch::{
    DEFAULT_MAX_TOOL_ROUNDS, DispatchError, MAX_ROUNDS_MESSAGE, RequestOrchestrator, ToolBox,
    ToolError, ToolHandler,
};
use modelgate_providers::{
    AdapterKind, AdapterTable, CatalogError, ModelCatalog, ProviderRegistry, RegistryError,
};
use modelgate_store::{CacheSettings, FileConfigSource, GatewayConfig, ProviderEntry};
use serde_json::{Value, json};

// ============================================================================
// Scripted Client
// ============================================================================

/// Plays back a list of answers, then keeps answering with plain text.
struct ScriptedClient {
    script: Mutex<VecDeque<AiResponse>>,
    repeat_tools: bool,
    requests: Mutex<Vec<AiRequest>>,
}

impl ScriptedClient {
    fn new(script: Vec<AiResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            repeat_tools: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// A client that asks for a tool on every call.
    fn always_tools() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            repeat_tools: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> AiRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    fn next(&self, request: &AiRequest) -> AiResponse {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let call = requests.len();

        if self.repeat_tools {
            return tool_round(&format!("call-{call}"));
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| AiResponse::done("final answer", FinishReason::Stop))
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn send_request(&self, request: &AiRequest) -> AiResponse {
        self.next(request)
    }

    async fn send_stream_request(&self, request: &AiRequest, sink: &mut ChunkSink<'_>) {
        let response = self.next(request);
        sink(AiResponse::chunk("thinking"));
        sink(response);
    }

    async fn status(&self, _model_id: &str) -> ModelStatus {
        ModelStatus::Online
    }

    async fn model_details(&self, model_id: &str) -> ModelDetails {
        ModelDetails::from_descriptor(&ModelDescriptor::new(model_id, "openai"), ModelStatus::Online)
    }
}

fn tool_round(id: &str) -> AiResponse {
    AiResponse::tool_calls(vec![ToolCall::new(id, "lookup", json!({"q": id}))])
}

// ============================================================================
// Tools
// ============================================================================

struct Lookup;

#[async_trait]
impl ToolHandler for Lookup {
    fn name(&self) -> &str {
        "lookup"
    }

    fn definition(&self) -> Value {
        json!({"type": "function", "function": {"name": "lookup", "parameters": {}}})
    }

    async fn call(&self, arguments: &Value) -> Result<Value, ToolError> {
        let query = arguments["q"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("q is required".to_string()))?;
        Ok(Value::String(format!("result for {query}")))
    }
}

/// A lookup tool whose backend crashes.
struct CrashingLookup;

#[async_trait]
impl ToolHandler for CrashingLookup {
    fn name(&self) -> &str {
        "lookup"
    }

    fn definition(&self) -> Value {
        json!({"type": "function", "function": {"name": "lookup", "parameters": {}}})
    }

    async fn call(&self, _arguments: &Value) -> Result<Value, ToolError> {
        panic!("lookup backend crashed");
    }
}

fn lookup_tools() -> ToolBox {
    let mut tools = ToolBox::new();
    tools.register(Arc::new(Lookup));
    tools
}

// ============================================================================
// Wiring
// ============================================================================

fn orchestrator(client: &Arc<ScriptedClient>, max_rounds: usize) -> RequestOrchestrator {
    let shared: Arc<dyn ModelClient> = client.clone();
    wired(shared, max_rounds)
}

fn wired(shared: Arc<dyn ModelClient>, max_rounds: usize) -> RequestOrchestrator {
    gateway(shared, lookup_tools()).with_max_tool_rounds(max_rounds)
}

/// Wires a client and tools with the default round limit.
fn gateway(shared: Arc<dyn ModelClient>, tools: ToolBox) -> RequestOrchestrator {
    let config = GatewayConfig {
        providers: vec![
            ProviderEntry::new(ProviderConfig::new("openai", ApiFormat::new("openai-api")))
                .with_model(ModelDescriptor::new("gpt-x", "")),
        ],
        ..GatewayConfig::default()
    };

    let mut table = AdapterTable::empty();
    table.register(
        AdapterKind::Generic,
        Arc::new(move |_: &ProviderConfig| Ok::<_, RegistryError>(Arc::clone(&shared))),
    );

    let cache = CacheSettings::default();
    let registry = ProviderRegistry::new(
        Arc::new(FileConfigSource::from_config(config)),
        table,
        &cache,
    );
    let catalog = ModelCatalog::new(Arc::new(registry), &cache);

    RequestOrchestrator::new(Arc::new(catalog), Arc::new(tools))
}

fn request() -> AiRequest {
    AiRequest::new(vec![Message::user("what is up")])
        .with_model("gpt-x")
        .with_tool(json!({"type": "function", "function": {"name": "lookup"}}))
}

fn statuses(chunks: &[AiResponse]) -> Vec<String> {
    chunks
        .iter()
        .filter_map(|c| c.status_message.clone())
        .collect()
}

// ============================================================================
// Non-streaming
// ============================================================================

#[tokio::test]
async fn test_plain_answer_needs_one_call() {
    let client = ScriptedClient::new(vec![AiResponse::done("hi", FinishReason::Stop)]);
    let response = orchestrator(&client, 5).send_request(request()).await.unwrap();

    assert_eq!(response.content, "hi");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_tool_rounds_until_plain_answer() {
    let client = ScriptedClient::new(vec![tool_round("a"), tool_round("b")]);
    let response = orchestrator(&client, 5).send_request(request()).await.unwrap();

    assert_eq!(response.content, "final answer");
    assert_eq!(client.calls(), 3);

    let second = client.request(1);
    assert_eq!(second.messages.len(), 3);
    assert_eq!(second.messages[1].role, Role::Assistant);
    assert_eq!(second.messages[2].role, Role::Tool);
    assert_eq!(second.messages[2].tool_call_id.as_deref(), Some("a"));
    assert_eq!(second.messages[2].content.as_deref(), Some("result for a"));
    assert!(second.offers_tools());

    // Each round builds on the previous one.
    assert_eq!(client.request(2).messages.len(), 5);
}

#[tokio::test]
async fn test_always_tools_stops_after_forced_round() {
    let client = ScriptedClient::always_tools();
    let response = orchestrator(&client, 3).send_request(request()).await.unwrap();

    // Three tool rounds plus the final one with tools off.
    assert_eq!(client.calls(), 4);
    assert!(response.has_tool_calls());

    let last = client.request(3);
    assert!(last.tools_disabled);
    assert!(!last.offers_tools());
    assert!(client.request(2).offers_tools());
}

#[tokio::test]
async fn test_default_round_limit() {
    let client = ScriptedClient::always_tools();
    let shared: Arc<dyn ModelClient> = client.clone();
    let orchestrator = gateway(shared, lookup_tools());
    assert_eq!(orchestrator.max_tool_rounds(), DEFAULT_MAX_TOOL_ROUNDS);

    orchestrator.send_request(request()).await.unwrap();

    // Five tool rounds plus the forced final one.
    assert_eq!(client.calls(), 6);
    assert!(client.request(5).tools_disabled);
    assert!(!client.request(4).tools_disabled);
}

#[tokio::test]
async fn test_provider_failure_is_returned_as_response() {
    let client = ScriptedClient::new(vec![AiResponse::failure("upstream 502")]);
    let response = orchestrator(&client, 5).send_request(request()).await.unwrap();

    assert!(response.is_error());
    assert_eq!(response.error.as_deref(), Some("upstream 502"));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_unknown_model_fails_before_any_call() {
    let client = ScriptedClient::new(vec![]);
    let err = orchestrator(&client, 5)
        .send_request(request().with_model("nope"))
        .await
        .unwrap_err();

    assert!(err.is_unresolved_model());
    assert!(matches!(
        err,
        DispatchError::Catalog(CatalogError::ModelNotAvailable(ref id)) if id == "nope"
    ));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_payload_requires_model() {
    let client = ScriptedClient::new(vec![]);
    let orchestrator = orchestrator(&client, 5);

    let err = orchestrator
        .send_payload(json!({"messages": [{"role": "user", "content": "hi"}]}))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::ModelNotInPayload));

    let err = orchestrator.send_payload(json!([1, 2])).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidPayload(_)));

    let err = orchestrator.send_request(AiRequest::default()).await.unwrap_err();
    assert!(matches!(err, DispatchError::NoModelBound));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_payload_is_dispatched() {
    let client = ScriptedClient::new(vec![AiResponse::done("ok", FinishReason::Stop)]);
    let response = orchestrator(&client, 5)
        .send_payload(json!({
            "model": "gpt-x",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.2
        }))
        .await
        .unwrap();

    assert_eq!(response.content, "ok");
    assert_eq!(client.request(0).options["temperature"], json!(0.2));
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test]
async fn test_stream_only_last_round_completes() {
    let client = ScriptedClient::new(vec![tool_round("a"), tool_round("b")]);
    let orchestrator = orchestrator(&client, 5);

    let mut chunks = Vec::new();
    orchestrator
        .send_stream_request(request(), &mut |chunk: AiResponse| chunks.push(chunk))
        .await
        .unwrap();

    assert_eq!(client.calls(), 3);

    let done: Vec<&AiResponse> = chunks.iter().filter(|c| c.is_done).collect();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].content, "final answer");
    assert!(chunks.last().unwrap().is_done);

    // Tool-call chunks still reach the caller, just not as completions.
    assert_eq!(chunks.iter().filter(|c| c.has_tool_calls()).count(), 2);
    assert_eq!(statuses(&chunks), vec!["Executing lookup...", "Executing lookup..."]);
}

#[tokio::test]
async fn test_stream_forced_final_round() {
    let client = ScriptedClient::always_tools();
    let orchestrator = orchestrator(&client, 2);

    let mut chunks = Vec::new();
    orchestrator
        .send_stream_request(request(), &mut |chunk: AiResponse| chunks.push(chunk))
        .await
        .unwrap();

    assert_eq!(client.calls(), 3);
    assert_eq!(
        statuses(&chunks),
        vec!["Executing lookup...".to_string(), MAX_ROUNDS_MESSAGE.to_string()]
    );

    // The forced round streams straight through.
    let done: Vec<&AiResponse> = chunks.iter().filter(|c| c.is_done).collect();
    assert_eq!(done.len(), 1);
    assert!(client.request(2).tools_disabled);
}

#[tokio::test]
async fn test_stream_without_terminal_chunk_ends_quietly() {
    struct Silent;

    #[async_trait]
    impl ModelClient for Silent {
        async fn send_request(&self, _request: &AiRequest) -> AiResponse {
            AiResponse::default()
        }

        async fn send_stream_request(&self, _request: &AiRequest, sink: &mut ChunkSink<'_>) {
            sink(AiResponse::chunk("partial"));
        }

        async fn status(&self, _model_id: &str) -> ModelStatus {
            ModelStatus::Online
        }

        async fn model_details(&self, model_id: &str) -> ModelDetails {
            ModelDetails::from_descriptor(&ModelDescriptor::new(model_id, "x"), ModelStatus::Online)
        }
    }

    let orchestrator = wired(Arc::new(Silent), 5);
    let model = orchestrator.resolve(&request()).await.unwrap();
    assert_eq!(model.id(), "gpt-x");

    let mut chunks = Vec::new();
    orchestrator
        .send_stream_request(request(), &mut |chunk: AiResponse| chunks.push(chunk))
        .await
        .unwrap();

    assert_eq!(chunks.len(), 1);
    assert!(!chunks[0].is_done);
    assert!(statuses(&chunks).is_empty());
}

#[tokio::test]
async fn test_stream_request_yields_finite_stream() {
    let client = ScriptedClient::new(vec![tool_round("a")]);
    let orchestrator = Arc::new(orchestrator(&client, 5));

    let items: Vec<Result<AiResponse, DispatchError>> =
        orchestrator.stream_request(request()).collect().await;

    let chunks: Vec<AiResponse> = items.into_iter().map(Result::unwrap).collect();
    assert_eq!(chunks.iter().filter(|c| c.is_done).count(), 1);
    assert_eq!(statuses(&chunks), vec!["Executing lookup..."]);
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_stream_request_reports_resolution_failure() {
    let client = ScriptedClient::new(vec![]);
    let orchestrator = Arc::new(orchestrator(&client, 5));

    let items: Vec<Result<AiResponse, DispatchError>> = orchestrator
        .stream_request(request().with_model("nope"))
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert!(items[0].as_ref().unwrap_err().is_unresolved_model());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_stream_request_reports_crashed_task() {
    let client = ScriptedClient::new(vec![tool_round("a")]);
    let mut tools = ToolBox::new();
    tools.register(Arc::new(CrashingLookup));
    let shared: Arc<dyn ModelClient> = client.clone();
    let orchestrator = Arc::new(gateway(shared, tools));

    let items: Vec<Result<AiResponse, DispatchError>> =
        orchestrator.stream_request(request()).collect().await;

    let (last, chunks) = items.split_last().unwrap();
    assert!(matches!(last, Err(DispatchError::StreamAborted(_))));
    assert!(chunks.iter().all(Result::is_ok));
    assert!(chunks.iter().flatten().all(|c| !c.is_done));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_dropping_stream_stops_tool_rounds() {
    let client = ScriptedClient::always_tools();
    let orchestrator = Arc::new(orchestrator(&client, 5));

    {
        let mut chunks = Box::pin(orchestrator.stream_request(request()));
        let first = chunks.next().await.unwrap().unwrap();
        assert_eq!(first.content, "thinking");
    }
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(client.calls(), 1);
}
