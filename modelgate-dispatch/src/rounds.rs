//! Per-round chunk handling for streamed requests.
//!
//! A round that stops because the model asked for tools must not look
//! finished to the caller. [`RoundFilter`] rewrites such a terminal chunk
//! to `is_done = false` and keeps the real one for the orchestrator, which
//! needs it to build the next round. Status chunks announce what happens
//! between rounds.

use modelgate_core::{AiResponse, ToolCall};

/// Status text sent before the forced final round.
pub const MAX_ROUNDS_MESSAGE: &str =
    "Maximum tool execution rounds reached. Generating final response...";

// ============================================================================
// Round Filter
// ============================================================================

/// Masks tool-call completion within one round.
///
/// Feed every chunk of a round through [`RoundFilter::forward`] in delivery
/// order, then read the round's terminal response with
/// [`RoundFilter::take_terminal`].
#[derive(Debug, Default)]
pub struct RoundFilter {
    terminal: Option<AiResponse>,
}

impl RoundFilter {
    /// Creates a filter for a new round.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the chunk the caller should see.
    ///
    /// A tool-call completion is returned with `is_done` cleared; the
    /// original is retained. Any other terminal chunk passes unchanged and
    /// is retained as well.
    pub fn forward(&mut self, chunk: AiResponse) -> AiResponse {
        if chunk.is_tool_call_completion() {
            let mut masked = chunk.clone();
            masked.is_done = false;
            self.terminal = Some(chunk);
            return masked;
        }

        if chunk.is_done {
            self.terminal = Some(chunk.clone());
        }
        chunk
    }

    /// Returns the last terminal chunk seen, if any.
    pub fn terminal(&self) -> Option<&AiResponse> {
        self.terminal.as_ref()
    }

    /// Takes the last terminal chunk, leaving the filter ready for the
    /// next round.
    pub fn take_terminal(&mut self) -> Option<AiResponse> {
        self.terminal.take()
    }
}

// ============================================================================
// Status Chunks
// ============================================================================

/// Status chunk announcing the tools about to run.
pub fn executing_status(tool_calls: &[ToolCall]) -> AiResponse {
    let names: Vec<&str> = tool_calls.iter().map(|c| c.name.as_str()).collect();
    AiResponse::status(format!("Executing {}...", names.join(", ")))
}

/// Status chunk announcing the forced final round.
pub fn max_rounds_status() -> AiResponse {
    AiResponse::status(MAX_ROUNDS_MESSAGE)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use modelgate_core::FinishReason;
    use serde_json::json;

    fn call(name: &str) -> ToolCall {
        ToolCall::new(format!("id-{name}"), name, json!({}))
    }

    #[test]
    fn test_content_chunks_pass_through() {
        let mut filter = RoundFilter::new();
        let out = filter.forward(AiResponse::chunk("Hel"));
        assert_eq!(out.content, "Hel");
        assert!(!out.is_done);
        assert!(filter.terminal().is_none());
    }

    #[test]
    fn test_tool_call_completion_is_masked() {
        let mut filter = RoundFilter::new();
        let out = filter.forward(AiResponse::tool_calls(vec![call("search")]));

        assert!(!out.is_done);
        assert_eq!(out.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(out.tool_calls.len(), 1);

        let terminal = filter.take_terminal().unwrap();
        assert!(terminal.is_done);
        assert!(filter.terminal().is_none());
    }

    #[test]
    fn test_normal_completion_passes_and_is_kept() {
        let mut filter = RoundFilter::new();
        let out = filter.forward(AiResponse::done("bye", FinishReason::Stop));
        assert!(out.is_done);
        assert_eq!(filter.terminal().unwrap().content, "bye");
    }

    #[test]
    fn test_later_terminal_replaces_earlier() {
        let mut filter = RoundFilter::new();
        filter.forward(AiResponse::tool_calls(vec![call("a")]));
        filter.forward(AiResponse::done("", FinishReason::Length));
        assert_eq!(
            filter.terminal().unwrap().finish_reason,
            Some(FinishReason::Length)
        );
    }

    #[test]
    fn test_status_texts() {
        let status = executing_status(&[call("toolA"), call("toolB")]);
        assert!(status.is_status());
        assert!(!status.is_done);
        assert!(status.content.is_empty());
        assert_eq!(status.status_message.as_deref(), Some("Executing toolA, toolB..."));

        let status = max_rounds_status();
        assert_eq!(status.status_message.as_deref(), Some(MAX_ROUNDS_MESSAGE));
        assert!(!status.is_done);
    }
}
