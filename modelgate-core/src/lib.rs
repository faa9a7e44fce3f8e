// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # modelgate Core
//!
//! Core types, models, and collaborator traits for the modelgate gateway.
//!
//! This crate provides the foundational abstractions used across all other
//! modelgate crates, including:
//!
//! - Domain models (providers, models, requests, responses, usage rows)
//! - Error types
//! - Trait definitions for every external collaborator
//!
//! ## Key Types
//!
//! ### Configuration
//! - [`ProviderConfig`] - One configured provider endpoint
//! - [`ApiFormat`] - The wire format a provider speaks
//! - [`ModelDescriptor`] - One model offered by a provider
//! - [`ModelAssignments`] - Configured default/system model ids
//! - [`UsageType`] - Internal vs. external-app traffic
//!
//! ### Requests
//! - [`AiRequest`] - A chat request, optionally bound to a model
//! - [`AiResponse`] - A response or one streamed chunk
//! - [`TokenUsage`] - What a response consumed
//!
//! ### Accounting
//! - [`UsageRecord`] - One ledger row per request attempt
//! - [`UsageStatus`] - Terminal attempt status

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Configuration
    ApiFormat,
    LEGACY_ADAPTER_KEY,
    ModelAssignments,
    ModelCapabilities,
    ModelDescriptor,
    ModelDetails,
    ModelIdMap,
    ModelStatus,
    ProviderConfig,
    TOOL_UNSUPPORTED,
    UsageType,
    // Requests
    AiRequest,
    AiResponse,
    FinishReason,
    Message,
    ResponseKind,
    Role,
    TokenUsage,
    ToolCall,
    // Accounting
    RecordScope,
    RecordType,
    UNKNOWN,
    UsageRecord,
    UsageStatus,
};

// Re-export traits
pub use traits::{
    ChunkSink, ModelClient, ModelProviderLookup, ProviderConfigSource, QuotaRecorder, ToolExecutor,
    UsageRecordRepository,
};
