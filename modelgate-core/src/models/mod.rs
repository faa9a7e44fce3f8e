//! Domain models for modelgate.
//!
//! ## Submodules
//!
//! - [`provider`] - Provider configuration (ProviderConfig, ApiFormat)
//! - [`model`] - Model descriptors, usage types, default/system assignments
//! - [`request`] - Requests, messages, tool calls
//! - [`response`] - Responses, token usage, finish reasons
//! - [`usage`] - Usage ledger records

mod model;
mod provider;
mod request;
mod response;
mod usage;

pub use model::{
    ModelAssignments, ModelCapabilities, ModelDescriptor, ModelDetails, ModelIdMap, ModelStatus,
    TOOL_UNSUPPORTED, UsageType,
};
pub use provider::{ApiFormat, LEGACY_ADAPTER_KEY, ProviderConfig};
pub use request::{AiRequest, Message, Role, ToolCall};
pub use response::{AiResponse, FinishReason, ResponseKind, TokenUsage};
pub use usage::{RecordScope, RecordType, UNKNOWN, UsageRecord, UsageStatus};
