// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # modelgate Store
//!
//! Configuration, caching, and usage accounting for modelgate.
//!
//! This crate provides:
//!
//! - **GatewayConfig**: The YAML/JSON configuration document
//! - **FileConfigSource**: A provider configuration source over that document
//! - **TtlCache**: Get-or-build cache with named invalidation
//! - **UsageAnalyzer**: Per-attempt usage ledger writes with quota hand-off
//! - **Persistence**: File I/O helpers for JSON/YAML documents
//!
//! ## Usage
//!
//! ```ignore
//! use modelgate_store::{FileConfigSource, UsageAnalyzer, UsageLedger, DailyUsageAggregator};
//!
//! let source = FileConfigSource::open("gateway.yaml")?;
//! let ledger = UsageLedger::new();
//! let analyzer = UsageAnalyzer::new(
//!     Arc::new(ledger.clone()),
//!     Arc::new(DailyUsageAggregator::new()),
//!     catalog,
//! );
//!
//! analyzer.submit_usage_record(Some(&usage), scope, UsageStatus::Success).await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod persistence;
pub mod usage;

pub use cache::TtlCache;
pub use config::{
    CacheSettings, DEFAULT_MODEL_KEY, FileConfigSource, GatewayConfig, OrchestratorSettings,
    ProviderEntry, SYSTEM_MODEL_KEYS, UsageSettings,
};
pub use error::StoreError;
pub use persistence::{
    DocumentFormat, default_config_dir, default_config_path, default_data_dir,
    default_ledger_path, load_document, save_document,
};
pub use usage::{
    DailyKey, DailyUsage, DailyUsageAggregator, MonthlySummary, UsageAnalyzer, UsageLedger,
    normalize_server_tool_use,
};
#[cfg(test)]
mod persistence_tests;
