//! Daily per-user usage aggregation.
//!
//! Rows are keyed by (user, date, provider, model) and carry request counts
//! per status plus token and tool-use sums. The aggregator doubles as the
//! live [`QuotaRecorder`] and as a batch rebuild over ledger rows.

use async_trait::async_trait;
use chrono::NaiveDate;
use modelgate_core::{CoreError, QuotaRecorder, UsageRecord, UsageStatus};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::normalize::merge_tool_use;

// ============================================================================
// Daily Usage Row
// ============================================================================

/// Grouping key of a daily row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DailyKey {
    /// User id.
    pub user_id: String,
    /// Calendar day (UTC).
    pub date: NaiveDate,
    /// Provider id.
    pub api_provider: String,
    /// Model id.
    pub model: String,
}

/// Aggregated usage of one user, day, provider and model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyUsage {
    /// Every accounted request.
    pub api_requests: u64,
    /// Requests that succeeded.
    pub successful_requests: u64,
    /// Requests that failed.
    pub failed_requests: u64,
    /// Requests that were cancelled.
    pub cancelled_requests: u64,
    /// Prompt tokens.
    pub prompt_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
    /// Prompt plus completion tokens.
    pub total_tokens: u64,
    /// Cache read tokens.
    pub cache_read_input_tokens: u64,
    /// Cache creation tokens.
    pub cache_creation_input_tokens: u64,
    /// Reasoning tokens.
    pub reasoning_tokens: u64,
    /// Audio input tokens.
    pub audio_input_tokens: u64,
    /// Audio output tokens.
    pub audio_output_tokens: u64,
    /// Summed tool usage. `None` if no record carried any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_tool_use: Option<BTreeMap<String, u64>>,
}

impl DailyUsage {
    /// Adds one record.
    pub fn add(&mut self, record: &UsageRecord) {
        self.api_requests += 1;
        match record.status {
            Some(UsageStatus::Success) => self.successful_requests += 1,
            Some(UsageStatus::Failed) => self.failed_requests += 1,
            Some(UsageStatus::Cancelled) => self.cancelled_requests += 1,
            None => {}
        }

        self.prompt_tokens += record.prompt_tokens;
        self.completion_tokens += record.completion_tokens;
        self.total_tokens += record.total_tokens();
        self.cache_read_input_tokens += record.cache_read_input_tokens;
        self.cache_creation_input_tokens += record.cache_creation_input_tokens;
        self.reasoning_tokens += record.reasoning_tokens;
        self.audio_input_tokens += record.audio_input_tokens;
        self.audio_output_tokens += record.audio_output_tokens;

        if let Some(tool_use) = record.server_tool_use.as_ref().filter(|m| !m.is_empty()) {
            merge_tool_use(self.server_tool_use.get_or_insert_with(BTreeMap::new), tool_use);
        }
    }
}

impl DailyKey {
    /// Returns the row a record belongs to. Records without a user have none.
    pub fn of(record: &UsageRecord) -> Option<Self> {
        Some(Self {
            user_id: record.scope.user_id.clone()?,
            date: record.created_at.date_naive(),
            api_provider: record.api_provider.clone(),
            model: record.model.clone(),
        })
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Live daily aggregation, fed one record at a time.
///
/// Records without a user are not aggregated.
#[derive(Clone, Default)]
pub struct DailyUsageAggregator {
    rows: Arc<RwLock<HashMap<DailyKey, DailyUsage>>>,
}

impl DailyUsageAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregates a batch of records for one day from scratch.
    pub fn aggregate_day(records: &[UsageRecord], date: NaiveDate) -> BTreeMap<DailyKey, DailyUsage> {
        let mut rows: BTreeMap<DailyKey, DailyUsage> = BTreeMap::new();
        for record in records {
            let Some(key) = DailyKey::of(record) else {
                continue;
            };
            if key.date == date {
                rows.entry(key).or_default().add(record);
            }
        }

        info!(date = %date, combinations = rows.len(), "Aggregated daily usage");
        rows
    }

    /// Returns the row for a key.
    pub async fn get(&self, key: &DailyKey) -> Option<DailyUsage> {
        self.rows.read().await.get(key).cloned()
    }
}

#[async_trait]
impl QuotaRecorder for DailyUsageAggregator {
    async fn record_usage(&self, record: &UsageRecord) -> Result<(), CoreError> {
        let Some(key) = DailyKey::of(record) else {
            debug!(id = ?record.id, "Record has no user, not aggregated");
            return Ok(());
        };
        self.rows.write().await.entry(key).or_default().add(record);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use modelgate_core::{RecordScope, RecordType};

    fn record(user: Option<&str>, status: UsageStatus, prompt: u64) -> UsageRecord {
        let mut scope = RecordScope::new(RecordType::Private);
        scope.user_id = user.map(str::to_string);
        let mut r = UsageRecord::pending(scope, "gpt-4o", "openai");
        r.prompt_tokens = prompt;
        r.completion_tokens = 1;
        r.status = Some(status);
        r
    }

    #[tokio::test]
    async fn test_live_counts_per_status() {
        let aggregator = DailyUsageAggregator::new();
        aggregator
            .record_usage(&record(Some("u"), UsageStatus::Success, 10))
            .await
            .unwrap();
        aggregator
            .record_usage(&record(Some("u"), UsageStatus::Failed, 0))
            .await
            .unwrap();
        aggregator
            .record_usage(&record(Some("u"), UsageStatus::Cancelled, 0))
            .await
            .unwrap();

        let sample = record(Some("u"), UsageStatus::Success, 0);
        let key = DailyKey::of(&sample).unwrap();
        assert_eq!(aggregator.rows.read().await.len(), 1);
        let usage = aggregator.get(&key).await.unwrap();
        assert_eq!(usage.api_requests, 3);
        assert_eq!(usage.successful_requests, 1);
        assert_eq!(usage.failed_requests, 1);
        assert_eq!(usage.cancelled_requests, 1);
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.total_tokens, 13);
    }

    #[tokio::test]
    async fn test_records_without_user_are_skipped() {
        let aggregator = DailyUsageAggregator::new();
        aggregator
            .record_usage(&record(None, UsageStatus::Success, 10))
            .await
            .unwrap();
        assert!(aggregator.rows.read().await.is_empty());
    }

    #[test]
    fn test_aggregate_day_merges_tool_use() {
        let mut a = record(Some("u"), UsageStatus::Success, 1);
        a.server_tool_use = Some(BTreeMap::from([("web_search".to_string(), 2)]));
        let mut b = record(Some("u"), UsageStatus::Success, 1);
        b.server_tool_use = Some(BTreeMap::from([("web_search".to_string(), 3)]));
        let date = a.created_at.date_naive();

        let rows = DailyUsageAggregator::aggregate_day(&[a, b], date);
        let usage = rows.values().next().unwrap();
        assert_eq!(usage.server_tool_use.as_ref().unwrap()["web_search"], 5);
    }

    #[test]
    fn test_aggregate_day_filters_date() {
        let r = record(Some("u"), UsageStatus::Success, 1);
        let other_day = r.created_at.date_naive().succ_opt().unwrap();
        assert!(DailyUsageAggregator::aggregate_day(&[r], other_day).is_empty());
    }
}
