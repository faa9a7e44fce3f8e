//! Adapter resolution cascade.
//!
//! A provider's adapter is decided by trying, in order:
//!
//! 1. The explicit `adapter` field of its API format
//! 2. The adapter name stored in the format metadata (legacy records)
//! 3. The name derived from the format key by convention
//! 4. The generic fallback
//!
//! A candidate is accepted only if it names a known [`AdapterKind`] that the
//! [`AdapterTable`] can construct. Rejected candidates are logged and the
//! cascade moves on; only a table without a fallback ends in an error.

use modelgate_core::ProviderConfig;
use serde::Serialize;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::adapter::{AdapterKind, conventional_adapter_name};
use crate::error::RegistryError;
use crate::table::AdapterTable;

// ============================================================================
// Resolution Step
// ============================================================================

/// One step of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStep {
    /// Explicit adapter field.
    ExplicitField,
    /// Adapter name in the format metadata.
    LegacyMetadata,
    /// Name derived from the format key.
    Convention,
    /// Generic fallback.
    Fallback,
}

impl fmt::Display for ResolutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ExplicitField => "explicit",
            Self::LegacyMetadata => "legacy",
            Self::Convention => "convention",
            Self::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Resolution Attempt
// ============================================================================

/// Record of one tried candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionAttempt {
    /// Step that produced the candidate.
    pub step: ResolutionStep,
    /// Candidate adapter name. `None` if the step had nothing to offer.
    pub candidate: Option<String>,
    /// Whether the candidate was accepted.
    pub accepted: bool,
    /// Why the candidate was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ResolutionAttempt {
    fn accepted(step: ResolutionStep, candidate: impl Into<String>) -> Self {
        Self {
            step,
            candidate: Some(candidate.into()),
            accepted: true,
            reason: None,
        }
    }

    fn rejected(step: ResolutionStep, candidate: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            step,
            candidate: candidate.map(str::to_string),
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

// ============================================================================
// Resolution Outcome
// ============================================================================

/// The outcome of resolving one provider's adapter.
#[derive(Debug)]
pub struct AdapterResolution {
    /// Provider id.
    pub provider_id: String,
    /// The accepted kind or the final error.
    pub result: Result<AdapterKind, RegistryError>,
    /// Every step that ran, in order.
    pub attempts: Vec<ResolutionAttempt>,
}

impl AdapterResolution {
    /// Returns true if an adapter was found.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns the accepted kind.
    pub fn kind(&self) -> Option<AdapterKind> {
        self.result.as_ref().ok().copied()
    }

    /// Returns the step that produced the accepted kind.
    pub fn accepted_step(&self) -> Option<ResolutionStep> {
        self.attempts.iter().find(|a| a.accepted).map(|a| a.step)
    }

    /// Returns true if only the fallback matched.
    pub fn used_fallback(&self) -> bool {
        self.accepted_step() == Some(ResolutionStep::Fallback)
    }

    /// Returns the rejection reasons, in order.
    pub fn warnings(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter_map(|a| a.reason.as_deref())
            .collect()
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Runs the resolution cascade against an adapter table.
#[derive(Debug, Clone)]
pub struct AdapterResolver {
    table: AdapterTable,
}

impl AdapterResolver {
    /// Creates a resolver over `table`.
    pub fn new(table: AdapterTable) -> Self {
        Self { table }
    }

    /// Returns the adapter table.
    pub fn table(&self) -> &AdapterTable {
        &self.table
    }

    /// Resolves the adapter of one provider.
    #[instrument(skip(self, config), fields(provider = %config.id))]
    pub fn resolve(&self, config: &ProviderConfig) -> AdapterResolution {
        let format = config.api_format.as_ref();
        let convention = conventional_adapter_name(config.format_name());

        let candidates = [
            (
                ResolutionStep::ExplicitField,
                format
                    .and_then(|f| f.adapter.as_deref())
                    .map(str::trim)
                    .filter(|s| !s.is_empty()),
            ),
            (
                ResolutionStep::LegacyMetadata,
                format.and_then(|f| f.legacy_adapter()),
            ),
            (ResolutionStep::Convention, convention.as_deref()),
        ];

        let mut attempts = Vec::with_capacity(candidates.len() + 1);
        for (step, candidate) in candidates {
            let Some(name) = candidate else {
                debug!(%step, "No candidate");
                attempts.push(ResolutionAttempt::rejected(step, None, "No candidate"));
                continue;
            };

            match self.check(name) {
                Ok(kind) => {
                    debug!(%step, adapter = %kind, "Adapter resolved");
                    attempts.push(ResolutionAttempt::accepted(step, name));
                    return AdapterResolution {
                        provider_id: config.id.clone(),
                        result: Ok(kind),
                        attempts,
                    };
                }
                Err(reason) => {
                    warn!(%step, candidate = name, reason = %reason, "Adapter candidate rejected");
                    attempts.push(ResolutionAttempt::rejected(step, Some(name), reason));
                }
            }
        }

        let fallback = AdapterKind::Generic;
        let result = if self.table.contains(fallback) {
            warn!(adapter = %fallback, "Falling back to generic adapter");
            attempts.push(ResolutionAttempt::accepted(
                ResolutionStep::Fallback,
                fallback.adapter_name(),
            ));
            Ok(fallback)
        } else {
            attempts.push(ResolutionAttempt::rejected(
                ResolutionStep::Fallback,
                Some(fallback.adapter_name()),
                "Fallback adapter not registered",
            ));
            Err(RegistryError::NoUsableAdapter(config.id.clone()))
        };

        AdapterResolution {
            provider_id: config.id.clone(),
            result,
            attempts,
        }
    }

    fn check(&self, name: &str) -> Result<AdapterKind, String> {
        let kind = AdapterKind::from_adapter_name(name)
            .ok_or_else(|| format!("Unknown adapter {name}"))?;
        if self.table.contains(kind) {
            Ok(kind)
        } else {
            Err(format!("Adapter {kind} is not registered"))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
