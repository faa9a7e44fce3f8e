//! Request orchestration.
//!
//! Resolves the model of a request, sends it to the model's client and runs
//! the tool-call protocol: while the model asks for tools, the tools run and
//! a follow-up request goes out. After `max_tool_rounds` rounds one last
//! request is sent with tools disabled, whatever it returns.
//!
//! Rounds are strictly sequential. Provider failures come back inside the
//! response and end the loop like any other answer.

use futures::Stream;
use futures::stream;
use modelgate_core::{AiRequest, AiResponse, ChunkSink, ToolExecutor, UsageType};
use modelgate_providers::{ModelCatalog, ModelContext};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::DispatchError;
use crate::rounds::{RoundFilter, executing_status, max_rounds_status};

/// Default number of tool rounds before the forced final round.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

// ============================================================================
// Request Orchestrator
// ============================================================================

/// Drives requests through the catalog, the clients and the tool loop.
pub struct RequestOrchestrator {
    catalog: Arc<ModelCatalog>,
    tools: Arc<dyn ToolExecutor>,
    usage_type: UsageType,
    max_tool_rounds: usize,
}

impl RequestOrchestrator {
    /// Creates an orchestrator for default traffic.
    pub fn new(catalog: Arc<ModelCatalog>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self {
            catalog,
            tools,
            usage_type: UsageType::Default,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Sets the tool round limit.
    #[must_use]
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    /// Sets the usage type whose catalog resolves models.
    #[must_use]
    pub fn with_usage_type(mut self, usage_type: UsageType) -> Self {
        self.usage_type = usage_type;
        self
    }

    /// Returns the tool round limit.
    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Parses a raw payload into a request, requiring a `model` field.
    pub fn parse_payload(payload: Value) -> Result<AiRequest, DispatchError> {
        let request = AiRequest::from_payload(payload)?;
        if request.model.as_deref().is_none_or(str::is_empty) {
            return Err(DispatchError::ModelNotInPayload);
        }
        Ok(request)
    }

    /// Resolves the model a request is bound to.
    pub async fn resolve(&self, request: &AiRequest) -> Result<Arc<ModelContext>, DispatchError> {
        let model_id = request
            .model
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(DispatchError::NoModelBound)?;
        Ok(self.catalog.model_or_fail(model_id, self.usage_type).await?)
    }

    // ========================================================================
    // Non-streaming
    // ========================================================================

    /// Parses a raw payload and sends it.
    pub async fn send_payload(&self, payload: Value) -> Result<AiResponse, DispatchError> {
        let request = Self::parse_payload(payload)?;
        self.send_request(request).await
    }

    /// Sends a request and runs the tool loop to completion.
    pub async fn send_request(&self, request: AiRequest) -> Result<AiResponse, DispatchError> {
        let model = self.resolve(&request).await?;
        self.send_with_model(&model, request).await
    }

    /// Sends a request to an already resolved model.
    #[instrument(skip_all, fields(model = %model.id(), max_rounds = self.max_tool_rounds))]
    pub async fn send_with_model(
        &self,
        model: &ModelContext,
        request: AiRequest,
    ) -> Result<AiResponse, DispatchError> {
        let client = model.client().await?;
        let mut request = request;
        let mut round = 0;

        loop {
            let response = client.send_request(&request).await;
            if !self.tools.requires_tool_execution(&response) {
                return Ok(response);
            }

            info!(
                round = round + 1,
                tool_count = response.tool_calls.len(),
                "Tool execution required"
            );
            round += 1;

            if round >= self.max_tool_rounds {
                warn!(max_rounds = self.max_tool_rounds, "Max tool execution rounds reached");
                let last = self
                    .tools
                    .build_follow_up_request(&request, &response, true)
                    .await;
                return Ok(client.send_request(&last).await);
            }

            request = self
                .tools
                .build_follow_up_request(&request, &response, false)
                .await;
        }
    }

    // ========================================================================
    // Streaming
    // ========================================================================

    /// Parses a raw payload and streams it into `sink`.
    pub async fn send_stream_payload(
        &self,
        payload: Value,
        sink: &mut ChunkSink<'_>,
    ) -> Result<(), DispatchError> {
        let request = Self::parse_payload(payload)?;
        self.send_stream_request(request, sink).await
    }

    /// Streams a request into `sink`, running the tool loop.
    ///
    /// The sink sees a completed chunk only for the round that ends the
    /// request. Between rounds it receives status chunks.
    pub async fn send_stream_request(
        &self,
        request: AiRequest,
        sink: &mut ChunkSink<'_>,
    ) -> Result<(), DispatchError> {
        let model = self.resolve(&request).await?;
        self.stream_with_model(&model, request, sink).await
    }

    /// Streams a request to an already resolved model.
    pub async fn stream_with_model(
        &self,
        model: &ModelContext,
        request: AiRequest,
        sink: &mut ChunkSink<'_>,
    ) -> Result<(), DispatchError> {
        self.stream_rounds(model, request, sink, &|| true).await
    }

    /// Runs the streaming tool loop while `open` holds.
    ///
    /// `open` is checked before any tool runs, so a closed consumer costs
    /// at most the round in flight.
    #[instrument(skip_all, fields(model = %model.id(), max_rounds = self.max_tool_rounds))]
    async fn stream_rounds(
        &self,
        model: &ModelContext,
        request: AiRequest,
        sink: &mut ChunkSink<'_>,
        open: &(dyn Fn() -> bool + Sync),
    ) -> Result<(), DispatchError> {
        let client = model.client().await?;
        let mut request = request;
        let mut round = 0;

        loop {
            let mut filter = RoundFilter::new();
            {
                let mut forward = |chunk: AiResponse| sink(filter.forward(chunk));
                client.send_stream_request(&request, &mut forward).await;
            }

            let Some(terminal) = filter.take_terminal() else {
                debug!(round, "Round ended without a terminal chunk");
                return Ok(());
            };
            if !self.tools.requires_tool_execution(&terminal) {
                return Ok(());
            }

            tokio::task::yield_now().await;
            if !open() {
                info!(round = round + 1, "Chunk stream closed, skipping remaining rounds");
                return Ok(());
            }

            info!(
                round = round + 1,
                tool_count = terminal.tool_calls.len(),
                "Tool execution required in stream"
            );
            round += 1;

            if round >= self.max_tool_rounds {
                warn!(
                    max_rounds = self.max_tool_rounds,
                    "Max tool execution rounds reached in stream"
                );
                sink(max_rounds_status());
                let last = self
                    .tools
                    .build_follow_up_request(&request, &terminal, true)
                    .await;
                client.send_stream_request(&last, sink).await;
                return Ok(());
            }

            sink(executing_status(&terminal.tool_calls));
            request = self
                .tools
                .build_follow_up_request(&request, &terminal, false)
                .await;
        }
    }

    /// Streams a request as a finite stream of chunks.
    ///
    /// The stream ends after the last round. A resolution failure is
    /// yielded as the only item; a task that dies mid-stream ends it with
    /// [`DispatchError::StreamAborted`]. Dropping the stream stops the
    /// rounds.
    pub fn stream_request(
        self: &Arc<Self>,
        request: AiRequest,
    ) -> impl Stream<Item = Result<AiResponse, DispatchError>> + Send + 'static {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Arc::clone(self);

        let task = tokio::spawn(async move {
            let open = || !tx.is_closed();
            let mut sink = |chunk: AiResponse| {
                if tx.send(Ok(chunk)).is_err() {
                    debug!("Chunk stream dropped by consumer");
                }
            };

            let result = match orchestrator.resolve(&request).await {
                Ok(model) => {
                    orchestrator
                        .stream_rounds(&model, request, &mut sink, &open)
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                if tx.send(Err(e)).is_err() {
                    debug!("Chunk stream dropped before the error was delivered");
                }
            }
        });

        let receiver = ChunkReceiver {
            rx,
            task: Some(task),
        };
        stream::unfold(receiver, |mut receiver| async move {
            if let Some(item) = receiver.rx.recv().await {
                return Some((item, receiver));
            }

            let task = receiver.task.take()?;
            match task.await {
                Ok(()) => None,
                Err(e) => {
                    error!(error = %e, "Streaming task ended abnormally");
                    Some((Err(DispatchError::StreamAborted(e.to_string())), receiver))
                }
            }
        })
    }
}

// ============================================================================
// Chunk Receiver
// ============================================================================

/// Consumer side of a spawned stream. Aborts the task when dropped.
struct ChunkReceiver {
    rx: mpsc::UnboundedReceiver<Result<AiResponse, DispatchError>>,
    task: Option<JoinHandle<()>>,
}

impl Drop for ChunkReceiver {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
