//! Usage ledger types.
//!
//! - [`UsageRecord`] - One ledger row per request attempt
//! - [`UsageStatus`] - Terminal status of an attempt
//! - [`RecordType`] - What kind of traffic produced the row
//! - [`RecordScope`] - Who/where a row belongs to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::response::TokenUsage;

/// Provider/model label used when nothing better is known.
pub const UNKNOWN: &str = "unknown";

// ============================================================================
// Status & Type
// ============================================================================

/// Terminal status of a request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    /// The attempt completed.
    Success,
    /// The attempt failed.
    Failed,
    /// The caller cancelled the attempt.
    Cancelled,
}

impl UsageStatus {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for UsageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of traffic produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// Private chat.
    Private,
    /// Group chat.
    Group,
    /// External API traffic.
    Api,
    /// Title generation.
    Title,
    /// Prompt improvement.
    Improver,
    /// Summarization.
    Summarizer,
}

impl RecordType {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
            Self::Api => "api",
            Self::Title => "title",
            Self::Improver => "improver",
            Self::Summarizer => "summarizer",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who and where a record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordScope {
    /// Traffic kind.
    pub record_type: RecordType,
    /// Owning user, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Chat room, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

impl RecordScope {
    /// Creates a scope with only a record type.
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            user_id: None,
            room_id: None,
        }
    }

    /// Sets the user.
    #[must_use]
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the room.
    #[must_use]
    pub fn in_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }
}

// ============================================================================
// Usage Record
// ============================================================================

/// One ledger row describing a single request attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Repository id, assigned on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Traffic kind, user and room.
    #[serde(flatten)]
    pub scope: RecordScope,
    /// Model id.
    pub model: String,
    /// Canonical provider id.
    pub api_provider: String,
    /// Prompt tokens.
    pub prompt_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
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
    /// Tool usage in the canonical vocabulary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_tool_use: Option<BTreeMap<String, u64>>,
    /// `None` while pending.
    pub status: Option<UsageStatus>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Creates a zero-counter record with no status.
    pub fn pending(
        scope: RecordScope,
        model: impl Into<String>,
        api_provider: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            scope,
            model: model.into(),
            api_provider: api_provider.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
            cache_read_input_tokens: 0,
            cache_creation_input_tokens: 0,
            reasoning_tokens: 0,
            audio_input_tokens: 0,
            audio_output_tokens: 0,
            server_tool_use: None,
            status: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copies the counters of `usage` into the record.
    ///
    /// Tool usage and provider identity are left to the caller, which is
    /// expected to normalize and re-derive them.
    pub fn apply_counters(&mut self, usage: &TokenUsage) {
        self.prompt_tokens = usage.prompt_tokens;
        self.completion_tokens = usage.completion_tokens;
        self.cache_read_input_tokens = usage.cache_read_input_tokens;
        self.cache_creation_input_tokens = usage.cache_creation_input_tokens;
        self.reasoning_tokens = usage.reasoning_tokens;
        self.audio_input_tokens = usage.audio_input_tokens;
        self.audio_output_tokens = usage.audio_output_tokens;
    }

    /// Returns true until a terminal status has been written.
    pub fn is_pending(&self) -> bool {
        self.status.is_none()
    }

    /// Returns prompt plus completion tokens.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_record_is_zeroed() {
        let record = UsageRecord::pending(RecordScope::new(RecordType::Private), "m", "p");
        assert!(record.is_pending());
        assert_eq!(record.total_tokens(), 0);
        assert!(record.server_tool_use.is_none());
    }

    #[test]
    fn test_apply_counters() {
        let mut record = UsageRecord::pending(RecordScope::new(RecordType::Api), "m", "p");
        let mut usage = TokenUsage::new("m").with_tokens(12, 30);
        usage.reasoning_tokens = 4;

        record.apply_counters(&usage);
        assert_eq!(record.prompt_tokens, 12);
        assert_eq!(record.completion_tokens, 30);
        assert_eq!(record.reasoning_tokens, 4);
    }

    #[test]
    fn test_scope_is_flattened() {
        let scope = RecordScope::new(RecordType::Group).in_room("r1");
        let record = UsageRecord::pending(scope, "m", "p");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["record_type"], "group");
        assert_eq!(value["room_id"], "r1");
    }
}
