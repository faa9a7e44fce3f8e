//! Collaborator contracts.
//!
//! Every seam between the gateway core and the outside world is a trait
//! here, so each crate can be driven by mocks in tests:
//!
//! - [`ModelClient`] - What every provider adapter implements
//! - [`ToolExecutor`] - Runs tool calls and builds follow-up requests
//! - [`ProviderConfigSource`] - Read side of the configuration store
//! - [`UsageRecordRepository`] - Persistence of usage rows
//! - [`QuotaRecorder`] - Quota aggregation hand-off
//! - [`ModelProviderLookup`] - Canonical provider identity for a model id

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{
    AiRequest, AiResponse, ModelAssignments, ModelDescriptor, ModelDetails, ModelStatus,
    ProviderConfig, UsageRecord,
};

/// Receives streamed chunks, one call per chunk, in delivery order.
pub type ChunkSink<'a> = dyn FnMut(AiResponse) + Send + 'a;

// ============================================================================
// Model Client
// ============================================================================

/// The contract every provider adapter satisfies.
///
/// Provider and network failures are reported through
/// [`AiResponse::error`], never as a panic or an `Err`.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Sends a request and returns the complete response.
    async fn send_request(&self, request: &AiRequest) -> AiResponse;

    /// Sends a request and pushes every chunk into `sink`.
    ///
    /// The last chunk of a round has `is_done` set.
    async fn send_stream_request(&self, request: &AiRequest, sink: &mut ChunkSink<'_>);

    /// Returns the reachability of a model.
    async fn status(&self, model_id: &str) -> ModelStatus;

    /// Returns the details of a model.
    async fn model_details(&self, model_id: &str) -> ModelDetails;
}

// ============================================================================
// Tool Execution
// ============================================================================

/// Runs tool calls requested by a model.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns true if the response asks the caller to run tools.
    fn requires_tool_execution(&self, response: &AiResponse) -> bool;

    /// Runs the response's tool calls and builds the next request.
    ///
    /// With `disable_tools` the returned request offers no tools.
    async fn build_follow_up_request(
        &self,
        request: &AiRequest,
        response: &AiResponse,
        disable_tools: bool,
    ) -> AiRequest;
}

// ============================================================================
// Configuration Source
// ============================================================================

/// Read side of the provider configuration store.
#[async_trait]
pub trait ProviderConfigSource: Send + Sync {
    /// Returns every configured provider, active or not.
    async fn providers(&self) -> Result<Vec<ProviderConfig>, CoreError>;

    /// Returns the raw model descriptors of one provider.
    async fn models(&self, provider_id: &str) -> Result<Vec<ModelDescriptor>, CoreError>;

    /// Returns the configured default/system model ids.
    async fn model_assignments(&self) -> Result<ModelAssignments, CoreError>;

    /// Returns one provider by id.
    async fn provider(&self, provider_id: &str) -> Result<Option<ProviderConfig>, CoreError> {
        Ok(self
            .providers()
            .await?
            .into_iter()
            .find(|p| p.id == provider_id))
    }
}

// ============================================================================
// Usage Accounting
// ============================================================================

/// Persistence of usage rows.
#[async_trait]
pub trait UsageRecordRepository: Send + Sync {
    /// Stores a new record and returns it with its id assigned.
    async fn create(&self, record: UsageRecord) -> Result<UsageRecord, CoreError>;

    /// Overwrites an existing record.
    async fn update(&self, record: &UsageRecord) -> Result<(), CoreError>;

    /// Fetches a record by id.
    async fn find(&self, id: u64) -> Result<Option<UsageRecord>, CoreError>;
}

/// Quota aggregation hand-off. Side effect only.
#[async_trait]
pub trait QuotaRecorder: Send + Sync {
    /// Accounts one written record.
    async fn record_usage(&self, record: &UsageRecord) -> Result<(), CoreError>;
}

/// Resolves the canonical provider id of a model.
#[async_trait]
pub trait ModelProviderLookup: Send + Sync {
    /// Returns the id of the provider that owns `model_id`.
    async fn provider_for_model(&self, model_id: &str) -> Result<String, CoreError>;
}
