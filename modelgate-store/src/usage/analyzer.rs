//! Per-attempt usage accounting.
//!
//! Writes ledger rows through a [`UsageRecordRepository`], resolves provider
//! identity through a [`ModelProviderLookup`], and forwards every terminal
//! write to a [`QuotaRecorder`].

use chrono::Utc;
use modelgate_core::{
    ModelProviderLookup, QuotaRecorder, RecordScope, TokenUsage, UNKNOWN, UsageRecord,
    UsageRecordRepository, UsageStatus,
};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use super::normalize::normalize_server_tool_use;
use crate::error::StoreError;

/// Records token and resource consumption per request attempt.
pub struct UsageAnalyzer {
    repository: Arc<dyn UsageRecordRepository>,
    quota: Arc<dyn QuotaRecorder>,
    lookup: Arc<dyn ModelProviderLookup>,
}

impl UsageAnalyzer {
    /// Creates an analyzer over its three collaborators.
    pub fn new(
        repository: Arc<dyn UsageRecordRepository>,
        quota: Arc<dyn QuotaRecorder>,
        lookup: Arc<dyn ModelProviderLookup>,
    ) -> Self {
        Self {
            repository,
            quota,
            lookup,
        }
    }

    /// Returns the canonical provider id of a model.
    ///
    /// A failed lookup degrades to [`UNKNOWN`].
    pub async fn provider_for_model(&self, model_id: &str) -> String {
        match self.lookup.provider_for_model(model_id).await {
            Ok(provider) => provider,
            Err(e) if e.is_not_found() => {
                warn!(model = %model_id, "Model not found while resolving provider");
                UNKNOWN.to_string()
            }
            Err(e) => {
                error!(model = %model_id, error = %e, "Failed to determine provider from model");
                UNKNOWN.to_string()
            }
        }
    }

    /// Creates a zero-counter record with no status at request start.
    ///
    /// Without an explicit provider label, the provider is derived from the
    /// model. Pending rows are not forwarded to quota aggregation.
    #[instrument(skip(self, scope), fields(record_type = %scope.record_type))]
    pub async fn create_pending_record(
        &self,
        scope: RecordScope,
        model: Option<&str>,
        api_provider: Option<&str>,
    ) -> Result<UsageRecord, StoreError> {
        let api_provider = match (api_provider, model) {
            (Some(label), _) => label.to_string(),
            (None, Some(model)) => self.provider_for_model(model).await,
            (None, None) => UNKNOWN.to_string(),
        };

        let record = UsageRecord::pending(scope, model.unwrap_or(UNKNOWN), api_provider);
        let record = self.repository.create(record).await?;
        debug!(id = ?record.id, "Created pending usage record");
        Ok(record)
    }

    /// Completes a pending record with a terminal status and, if present,
    /// the final usage.
    ///
    /// With usage, the model is taken from the usage. The provider is
    /// always re-derived from the model when one is known, so a label given
    /// at creation never reaches the final row.
    #[instrument(skip(self, record, usage), fields(id = ?record.id, status = %status))]
    pub async fn update_record(
        &self,
        record: &mut UsageRecord,
        usage: Option<&TokenUsage>,
        status: UsageStatus,
    ) -> Result<(), StoreError> {
        record.status = Some(status);

        if let Some(usage) = usage {
            record.apply_counters(usage);
            record.server_tool_use = normalize_server_tool_use(usage.server_tool_use.as_ref());
            record.model = model_or_unknown(usage);
        }
        if record.model != UNKNOWN {
            record.api_provider = self.provider_for_model(&record.model).await;
        }
        record.updated_at = Utc::now();

        self.repository.update(record).await?;
        self.push_quota(record).await;
        Ok(())
    }

    /// Writes one finished record in a single step.
    ///
    /// Nothing is written when usage is absent and the status is success;
    /// failed and cancelled attempts are always recorded. Returns the
    /// written record, if any.
    #[instrument(skip(self, usage, scope), fields(record_type = %scope.record_type, status = %status))]
    pub async fn submit_usage_record(
        &self,
        usage: Option<&TokenUsage>,
        scope: RecordScope,
        status: UsageStatus,
    ) -> Result<Option<UsageRecord>, StoreError> {
        if usage.is_none() && status == UsageStatus::Success {
            debug!("No usage for a successful request, nothing to record");
            return Ok(None);
        }

        let mut record = match usage {
            Some(usage) => {
                let model = model_or_unknown(usage);
                let provider = self.provider_for_model(&model).await;
                let mut record = UsageRecord::pending(scope, model, provider);
                record.apply_counters(usage);
                record.server_tool_use = normalize_server_tool_use(usage.server_tool_use.as_ref());
                record
            }
            None => UsageRecord::pending(scope, UNKNOWN, UNKNOWN),
        };
        record.status = Some(status);

        let record = self.repository.create(record).await?;
        self.push_quota(&record).await;
        Ok(Some(record))
    }

    /// Writes a zero-counter record for an attempt that never produced
    /// usage, e.g. a request that failed before reaching the provider.
    ///
    /// The provider is derived from the model when one is known; the label
    /// is only used when no model is.
    #[instrument(skip(self, scope), fields(record_type = %scope.record_type, status = %status))]
    pub async fn record_error(
        &self,
        scope: RecordScope,
        model: Option<&str>,
        api_provider: Option<&str>,
        status: UsageStatus,
    ) -> Result<UsageRecord, StoreError> {
        let api_provider = match model {
            Some(model) => self.provider_for_model(model).await,
            None => api_provider.unwrap_or(UNKNOWN).to_string(),
        };

        let mut record = UsageRecord::pending(scope, model.unwrap_or(UNKNOWN), api_provider);
        record.status = Some(status);

        let record = self.repository.create(record).await?;
        self.push_quota(&record).await;
        Ok(record)
    }

    /// Forwards a record to quota aggregation. Failures are logged only.
    async fn push_quota(&self, record: &UsageRecord) {
        if let Err(e) = self.quota.record_usage(record).await {
            error!(
                id = ?record.id,
                status = ?record.status,
                error = %e,
                "Failed to record usage in daily aggregation"
            );
        }
    }
}

fn model_or_unknown(usage: &TokenUsage) -> String {
    if usage.model.is_empty() {
        UNKNOWN.to_string()
    } else {
        usage.model.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
