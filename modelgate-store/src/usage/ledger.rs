//! In-memory usage ledger with file persistence.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use modelgate_core::{CoreError, RecordType, UsageRecord, UsageRecordRepository};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{load_document, save_document};

// ============================================================================
// Snapshot
// ============================================================================

/// Serialized form of the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerSnapshot {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    records: Vec<UsageRecord>,
}

/// Token totals of one (user, room, type, model) group in a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    /// Owning user.
    pub user_id: Option<String>,
    /// Chat room.
    pub room_id: Option<String>,
    /// Traffic kind.
    pub record_type: RecordType,
    /// Model id.
    pub model: String,
    /// Summed prompt tokens.
    pub prompt_tokens: u64,
    /// Summed completion tokens.
    pub completion_tokens: u64,
}

struct LedgerInner {
    next_id: u64,
    records: BTreeMap<u64, UsageRecord>,
}

// ============================================================================
// Usage Ledger
// ============================================================================

/// A [`UsageRecordRepository`] that keeps rows in memory.
///
/// Ids are assigned in creation order starting at 1.
#[derive(Clone)]
pub struct UsageLedger {
    inner: Arc<RwLock<LedgerInner>>,
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(LedgerInner {
                next_id: 1,
                records: BTreeMap::new(),
            })),
        }
    }

    /// Loads a ledger from disk. A missing file yields an empty ledger.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Ledger file not found, starting empty");
            return Ok(Self::new());
        }

        let snapshot: LedgerSnapshot = load_document(path).await?;
        let mut records = BTreeMap::new();
        let mut max_id = 0;
        for record in snapshot.records {
            let Some(id) = record.id else {
                return Err(StoreError::MissingRecordId);
            };
            max_id = max_id.max(id);
            records.insert(id, record);
        }

        info!(path = %path.display(), count = records.len(), "Loaded usage ledger");
        Ok(Self {
            inner: Arc::new(RwLock::new(LedgerInner {
                next_id: snapshot.next_id.max(max_id + 1),
                records,
            })),
        })
    }

    /// Writes the ledger to disk.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot = {
            let inner = self.inner.read().await;
            LedgerSnapshot {
                next_id: inner.next_id,
                records: inner.records.values().cloned().collect(),
            }
        };
        save_document(path, &snapshot).await?;
        debug!(path = %path.display(), count = snapshot.records.len(), "Saved usage ledger");
        Ok(())
    }

    /// Returns every record in id order.
    pub async fn records(&self) -> Vec<UsageRecord> {
        self.inner.read().await.records.values().cloned().collect()
    }

    /// Returns the records created on `date` (UTC).
    pub async fn records_on(&self, date: NaiveDate) -> Vec<UsageRecord> {
        let inner = self.inner.read().await;
        inner
            .records
            .values()
            .filter(|r| r.created_at.date_naive() == date)
            .cloned()
            .collect()
    }

    /// Returns the number of records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Returns true if the ledger holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sums tokens per (user, room, type, model) for one calendar month.
    pub async fn summarize_month(&self, year: i32, month: u32) -> Vec<MonthlySummary> {
        type Key = (Option<String>, Option<String>, RecordType, String);
        let inner = self.inner.read().await;

        let mut groups: Vec<(Key, (u64, u64))> = Vec::new();
        for record in inner
            .records
            .values()
            .filter(|r| r.created_at.year() == year && r.created_at.month() == month)
        {
            let key: Key = (
                record.scope.user_id.clone(),
                record.scope.room_id.clone(),
                record.scope.record_type,
                record.model.clone(),
            );
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, totals)) => {
                    totals.0 += record.prompt_tokens;
                    totals.1 += record.completion_tokens;
                }
                None => groups.push((key, (record.prompt_tokens, record.completion_tokens))),
            }
        }

        groups
            .into_iter()
            .map(|((user_id, room_id, record_type, model), (prompt, completion))| {
                MonthlySummary {
                    user_id,
                    room_id,
                    record_type,
                    model,
                    prompt_tokens: prompt,
                    completion_tokens: completion,
                }
            })
            .collect()
    }
}

#[async_trait]
impl UsageRecordRepository for UsageLedger {
    async fn create(&self, mut record: UsageRecord) -> Result<UsageRecord, CoreError> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;

        record.id = Some(id);
        inner.records.insert(id, record.clone());
        debug!(id, model = %record.model, "Created usage record");
        Ok(record)
    }

    async fn update(&self, record: &UsageRecord) -> Result<(), CoreError> {
        let id = record.id.ok_or(StoreError::MissingRecordId)?;
        let mut inner = self.inner.write().await;
        let slot = inner
            .records
            .get_mut(&id)
            .ok_or(StoreError::RecordNotFound(id))?;
        *slot = record.clone();
        Ok(())
    }

    async fn find(&self, id: u64) -> Result<Option<UsageRecord>, CoreError> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use modelgate_core::{RecordScope, UsageStatus};

    fn record(user: &str, model: &str, prompt: u64) -> UsageRecord {
        let mut r = UsageRecord::pending(
            RecordScope::new(RecordType::Private).for_user(user),
            model,
            "p",
        );
        r.prompt_tokens = prompt;
        r.status = Some(UsageStatus::Success);
        r
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let ledger = UsageLedger::new();
        let a = ledger.create(record("u", "m", 1)).await.unwrap();
        let b = ledger.create(record("u", "m", 1)).await.unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert_eq!(ledger.len().await, 2);
    }

    #[tokio::test]
    async fn test_update_unknown_record_fails() {
        let ledger = UsageLedger::new();
        let mut r = record("u", "m", 1);
        assert!(ledger.update(&r).await.is_err());

        r.id = Some(42);
        let err = ledger.update(&r).await.unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
    }

    #[tokio::test]
    async fn test_summarize_month_groups() {
        let ledger = UsageLedger::new();
        for (user, model, prompt) in [("a", "m1", 10), ("a", "m1", 5), ("b", "m1", 1)] {
            let mut r = record(user, model, prompt);
            r.created_at = Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap();
            ledger.create(r).await.unwrap();
        }

        let summary = ledger.summarize_month(2025, 3).await;
        assert_eq!(summary.len(), 2);
        let a = summary
            .iter()
            .find(|s| s.user_id.as_deref() == Some("a"))
            .unwrap();
        assert_eq!(a.prompt_tokens, 15);
        assert!(ledger.summarize_month(2025, 4).await.is_empty());
    }

    #[tokio::test]
    async fn test_records_on_filters_by_day() {
        let ledger = UsageLedger::new();
        let mut old = record("a", "m", 1);
        old.created_at = Utc.with_ymd_and_hms(2020, 1, 1, 23, 59, 0).unwrap();
        ledger.create(old).await.unwrap();
        ledger.create(record("a", "m", 2)).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let records = ledger.records_on(day).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prompt_tokens, 1);
        assert!(ledger.records_on(day.succ_opt().unwrap()).await.is_empty());
    }
}
