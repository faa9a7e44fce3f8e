//! Usage accounting.
//!
//! - [`UsageAnalyzer`] - Pending/update and one-shot ledger writes
//! - [`UsageLedger`] - In-memory record repository with file persistence
//! - [`DailyUsageAggregator`] - Daily per-user quota aggregation
//! - [`normalize_server_tool_use`] - Provider vocabulary normalization

mod aggregation;
mod analyzer;
mod ledger;
mod normalize;

pub use aggregation::{DailyKey, DailyUsage, DailyUsageAggregator};
pub use analyzer::UsageAnalyzer;
pub use ledger::{MonthlySummary, UsageLedger};
pub use normalize::{WEB_SEARCH, canonical_tool_key, merge_tool_use, normalize_server_tool_use};
