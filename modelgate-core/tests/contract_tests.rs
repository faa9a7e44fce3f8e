//! Integration tests for the collaborator contracts.

use async_trait::async_trait;
use modelgate_core::{
    AiRequest, AiResponse, ApiFormat, ChunkSink, CoreError, FinishReason, Message,
    ModelAssignments, ModelClient, ModelDescriptor, ModelDetails, ModelStatus, ProviderConfig,
    ProviderConfigSource,
};

struct EchoClient;

#[async_trait]
impl ModelClient for EchoClient {
    async fn send_request(&self, request: &AiRequest) -> AiResponse {
        let text = request
            .messages
            .last()
            .and_then(|m| m.content.clone())
            .unwrap_or_default();
        AiResponse::done(text, FinishReason::Stop)
    }

    async fn send_stream_request(&self, request: &AiRequest, sink: &mut ChunkSink<'_>) {
        sink(AiResponse::chunk("echo: "));
        sink(self.send_request(request).await);
    }

    async fn status(&self, _model_id: &str) -> ModelStatus {
        ModelStatus::Online
    }

    async fn model_details(&self, model_id: &str) -> ModelDetails {
        ModelDetails::from_descriptor(&ModelDescriptor::new(model_id, "echo"), ModelStatus::Online)
    }
}

struct StaticSource;

#[async_trait]
impl ProviderConfigSource for StaticSource {
    async fn providers(&self) -> Result<Vec<ProviderConfig>, CoreError> {
        Ok(vec![
            ProviderConfig::new("a", ApiFormat::new("openai-api")),
            ProviderConfig::new("b", ApiFormat::new("ollama-api")).inactive(),
        ])
    }

    async fn models(&self, provider_id: &str) -> Result<Vec<ModelDescriptor>, CoreError> {
        Ok(vec![ModelDescriptor::new("m", provider_id)])
    }

    async fn model_assignments(&self) -> Result<ModelAssignments, CoreError> {
        Ok(ModelAssignments::default())
    }
}

#[tokio::test]
async fn test_stream_sink_receives_chunks_in_order() {
    let client = EchoClient;
    let request = AiRequest::new(vec![Message::user("hi")]);

    let mut seen = Vec::new();
    client
        .send_stream_request(&request, &mut |chunk| seen.push(chunk))
        .await;

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].content, "echo: ");
    assert!(!seen[0].is_done);
    assert!(seen[1].is_done);
    assert_eq!(seen[1].content, "hi");
}

#[tokio::test]
async fn test_default_provider_lookup_finds_inactive_too() {
    let source = StaticSource;
    let provider = source.provider("b").await.unwrap().unwrap();
    assert!(!provider.active);
    assert!(source.provider("missing").await.unwrap().is_none());
}
