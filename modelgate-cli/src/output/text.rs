//! Text output formatting with colors.

use modelgate_core::AiResponse;
use modelgate_providers::{CatalogSummary, ResolutionStep};

use super::json::{AdapterOutput, DailyOutput, ResolveOutput, UsageOutput};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Formats a catalog: visible models, then default and system keys.
    pub fn format_catalog(&self, summary: &CatalogSummary) -> String {
        let mut lines = vec![
            self.bold(&format!("Catalog ({})", summary.usage_type)),
            "─".repeat(40),
        ];

        if summary.models.is_empty() {
            lines.push(self.dim("No visible models"));
        }
        for model in &summary.models {
            let label = if model.label == model.id {
                String::new()
            } else {
                format!(" {}", self.dim(&format!("({})", model.label)))
            };
            lines.push(format!(
                "  {:<28} {}{}",
                model.id,
                self.cyan(&model.provider),
                label
            ));
        }

        let sections = [
            ("Default models", &summary.defaults),
            ("System models", &summary.system),
        ];
        for (title, keys) in sections {
            if keys.is_empty() {
                continue;
            }
            lines.push(String::new());
            lines.push(self.bold(title));
            for (key, id) in keys {
                lines.push(format!("  {key:<20} → {id}"));
            }
        }

        lines.join("\n")
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Formats how a model id resolves.
    pub fn format_resolution(&self, output: &ResolveOutput) -> String {
        let mut lines = vec![self.bold(&output.model)];

        lines.push(format!("Provider: {}", self.cyan(&output.provider)));
        if let Some(adapter) = &output.adapter {
            lines.push(format!("Adapter:  {adapter}"));
        }
        if let Some(label) = &output.label {
            lines.push(format!("Label:    {label}"));
        }

        let catalog = if output.in_catalog {
            self.green(&format!("visible in {}", output.usage_type))
        } else {
            self.yellow(&format!("not in the {} catalog", output.usage_type))
        };
        lines.push(format!("Catalog:  {catalog}"));

        if let Some(status) = &output.status {
            lines.push(format!("Status:   {status}"));
        }

        lines.join("\n")
    }

    /// Formats adapter resolution for each provider.
    pub fn format_adapters(&self, outputs: &[AdapterOutput]) -> String {
        if outputs.is_empty() {
            return self.dim("No active providers");
        }

        let mut lines = Vec::new();
        for output in outputs {
            let verdict = match (&output.adapter, output.step) {
                (Some(adapter), Some(ResolutionStep::Fallback)) => {
                    self.yellow(&format!("⚠ {adapter} (fallback)"))
                }
                (Some(adapter), Some(step)) => self.green(&format!("✓ {adapter} ({step})")),
                _ => self.red(&format!(
                    "✗ {}",
                    output.error.as_deref().unwrap_or("no usable adapter")
                )),
            };
            lines.push(format!("{:<15} {}", output.provider, verdict));

            for attempt in output.attempts.iter().filter(|a| !a.accepted) {
                let candidate = attempt.candidate.as_deref().unwrap_or("-");
                let reason = attempt.reason.as_deref().unwrap_or_default();
                let step = attempt.step.to_string();
                lines.push(self.dim(&format!("  {step:<10} {candidate}: {reason}")));
            }
        }

        lines.join("\n")
    }

    // ========================================================================
    // Usage
    // ========================================================================

    /// Formats monthly token totals.
    pub fn format_usage(&self, output: &UsageOutput) -> String {
        let mut lines = vec![
            self.bold(&format!("Usage {}", output.month)),
            "─".repeat(40),
        ];

        if output.rows.is_empty() {
            lines.push(self.dim("No usage recorded"));
            return lines.join("\n");
        }

        for row in &output.rows {
            let user = row.user_id.as_deref().unwrap_or("-");
            lines.push(format!(
                "  {:<24} {:<10} {:<12} {:>8} in {:>8} out",
                row.model,
                row.record_type.to_string(),
                user,
                format_number(row.prompt_tokens),
                format_number(row.completion_tokens),
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "Total: {} in, {} out",
            self.bold(&format_number(output.prompt_tokens)),
            self.bold(&format_number(output.completion_tokens)),
        ));

        lines.join("\n")
    }

    /// Formats one day's aggregation.
    pub fn format_daily(&self, output: &DailyOutput) -> String {
        let mut lines = vec![
            self.bold(&format!("Usage {}", output.date)),
            "─".repeat(40),
        ];

        if output.rows.is_empty() {
            lines.push(self.dim("No usage recorded for a known user"));
            return lines.join("\n");
        }

        for row in &output.rows {
            let failures = if row.failed + row.cancelled > 0 {
                self.yellow(&format!(" ({} failed, {} cancelled)", row.failed, row.cancelled))
            } else {
                String::new()
            };
            lines.push(format!(
                "  {:<12} {:<12} {:<24} {:>4} req {:>8} in {:>8} out{}",
                row.user_id,
                row.provider,
                row.model,
                row.requests,
                format_number(row.prompt_tokens),
                format_number(row.completion_tokens),
                failures,
            ));
        }

        lines.join("\n")
    }

    // ========================================================================
    // Responses
    // ========================================================================

    /// Formats a streamed chunk for direct printing.
    ///
    /// Content is printed raw; status and errors get their own lines.
    pub fn format_chunk(&self, chunk: &AiResponse) -> String {
        if let Some(status) = &chunk.status_message {
            return format!("\n{}\n", self.dim(&format!("[{status}]")));
        }
        if let Some(error) = &chunk.error {
            return format!("\n{}\n", self.red(&format!("Error: {error}")));
        }
        chunk.content.clone()
    }

    /// Formats a complete response.
    pub fn format_response(&self, response: &AiResponse) -> String {
        if let Some(error) = &response.error {
            return self.red(&format!("Error: {error}"));
        }

        let mut lines = vec![response.content.clone()];
        if let Some(usage) = &response.usage {
            lines.push(self.dim(&format!(
                "{} in, {} out ({})",
                format_number(usage.prompt_tokens),
                format_number(usage.completion_tokens),
                usage.model
            )));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Color Helpers
    // ========================================================================

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Formats a token count with K/M suffixes.
pub fn format_number(n: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let value = n as f64;
    if n >= 1_000_000 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        n.to_string()
    }
}
