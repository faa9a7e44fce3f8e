//! JSON output formatting.

use anyhow::Result;
use modelgate_core::{AiResponse, UsageType};
use modelgate_providers::{AdapterResolution, ResolutionAttempt, ResolutionStep};
use chrono::NaiveDate;
use modelgate_store::{DailyKey, DailyUsage, MonthlySummary};
use std::collections::BTreeMap;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// Adapter resolution of one provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterOutput {
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<ResolutionStep>,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: Vec<ResolutionAttempt>,
}

impl From<&AdapterResolution> for AdapterOutput {
    fn from(resolution: &AdapterResolution) -> Self {
        Self {
            provider: resolution.provider_id.clone(),
            adapter: resolution.kind().map(|k| k.adapter_name().to_string()),
            step: resolution.accepted_step(),
            fallback: resolution.used_fallback(),
            error: resolution.result.as_ref().err().map(ToString::to_string),
            attempts: resolution.attempts.clone(),
        }
    }
}

/// How one model id resolves.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutput {
    pub model: String,
    pub usage_type: UsageType,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
    pub in_catalog: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Monthly token totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageOutput {
    pub month: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub rows: Vec<MonthlySummary>,
}

impl UsageOutput {
    /// Sums the rows of a month.
    pub fn new(month: impl Into<String>, rows: Vec<MonthlySummary>) -> Self {
        Self {
            month: month.into(),
            prompt_tokens: rows.iter().map(|r| r.prompt_tokens).sum(),
            completion_tokens: rows.iter().map(|r| r.completion_tokens).sum(),
            rows,
        }
    }
}

/// One user, provider and model on one day.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRow {
    pub user_id: String,
    pub provider: String,
    pub model: String,
    pub requests: u64,
    pub successful: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_tool_use: Option<BTreeMap<String, u64>>,
}

/// Daily aggregation of one day.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyOutput {
    pub date: NaiveDate,
    pub rows: Vec<DailyRow>,
}

impl DailyOutput {
    /// Flattens aggregated rows, keeping key order.
    pub fn new(date: NaiveDate, rows: BTreeMap<DailyKey, DailyUsage>) -> Self {
        let rows = rows
            .into_iter()
            .map(|(key, usage)| DailyRow {
                user_id: key.user_id,
                provider: key.api_provider,
                model: key.model,
                requests: usage.api_requests,
                successful: usage.successful_requests,
                failed: usage.failed_requests,
                cancelled: usage.cancelled_requests,
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                server_tool_use: usage.server_tool_use,
            })
            .collect();
        Self { date, rows }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats adapter resolutions.
    pub fn format_adapters(&self, resolutions: &[AdapterResolution]) -> Result<String> {
        let outputs: Vec<AdapterOutput> = resolutions.iter().map(AdapterOutput::from).collect();
        self.format(&outputs)
    }

    /// Formats one streamed chunk as a single line.
    ///
    /// Always compact so every chunk stays on its own line.
    pub fn format_chunk(chunk: &AiResponse) -> Result<String> {
        Ok(serde_json::to_string(chunk)?)
    }
}
