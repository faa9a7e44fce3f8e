//! Send command - run a prompt through the gateway.
//!
//! The attempt is written to the usage ledger like gateway traffic: a
//! pending record first, completed with the final usage or a failure.

use anyhow::Result;
use clap::Args;
use futures::StreamExt;
use modelgate_core::{
    AiRequest, AiResponse, Message, ModelProviderLookup, RecordScope, RecordType, UsageStatus,
    UsageType,
};
use modelgate_dispatch::{RequestOrchestrator, ToolBox};
use modelgate_store::{DailyKey, DailyUsageAggregator, UsageAnalyzer, UsageLedger};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::Gateway;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the send command.
#[derive(Args)]
pub struct SendArgs {
    /// Model id.
    pub model: String,

    /// User prompt.
    pub prompt: String,

    /// Optional system prompt.
    #[arg(long)]
    pub system: Option<String>,

    /// Stream the answer as it arrives.
    #[arg(long, short)]
    pub stream: bool,

    /// Send as external-app traffic.
    #[arg(long, short)]
    pub external: bool,

    /// User the attempt is accounted to.
    #[arg(long, short)]
    pub user: Option<String>,

    /// Do not write the attempt to the usage ledger.
    #[arg(long)]
    pub no_record: bool,
}

impl SendArgs {
    fn request(&self) -> AiRequest {
        let mut messages = Vec::new();
        if let Some(system) = &self.system {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(self.prompt.clone()));

        let mut request = AiRequest::new(messages).with_model(&self.model);
        request.stream = self.stream;
        request
    }

    fn usage_type(&self) -> UsageType {
        if self.external {
            UsageType::ExternalApp
        } else {
            UsageType::Default
        }
    }

    fn scope(&self) -> RecordScope {
        let record_type = if self.external {
            RecordType::Api
        } else {
            RecordType::Private
        };
        let scope = RecordScope::new(record_type);
        match &self.user {
            Some(user) => scope.for_user(user.clone()),
            None => scope,
        }
    }
}

/// Outcome of one dispatched prompt.
struct Outcome {
    response: Option<AiResponse>,
    error: Option<anyhow::Error>,
}

/// Runs the send command.
///
/// The ledger file is the durable usage record. Quota aggregation is kept
/// in memory for this run only, since every invocation is a new process.
pub async fn run(args: &SendArgs, cli: &Cli) -> Result<()> {
    let gateway = Gateway::open(cli).await?;
    let orchestrator = Arc::new(
        RequestOrchestrator::new(Arc::clone(&gateway.catalog), Arc::new(ToolBox::new()))
            .with_max_tool_rounds(gateway.config.orchestrator.max_tool_rounds)
            .with_usage_type(args.usage_type()),
    );

    let ledger_path = gateway.config.usage.ledger_path();
    let ledger = UsageLedger::load(&ledger_path).await?;
    let lookup: Arc<dyn ModelProviderLookup> = gateway.catalog.clone();
    let aggregator = DailyUsageAggregator::new();
    let analyzer = UsageAnalyzer::new(
        Arc::new(ledger.clone()),
        Arc::new(aggregator.clone()),
        lookup,
    );

    let mut record = if args.no_record {
        None
    } else {
        Some(
            analyzer
                .create_pending_record(args.scope(), Some(&args.model), None)
                .await?,
        )
    };

    let outcome = if args.stream {
        stream(&orchestrator, args.request(), cli).await
    } else {
        send(&orchestrator, args.request(), cli).await
    };

    if let Some(record) = record.as_mut() {
        let response = outcome.response.as_ref();
        let status = match response {
            Some(r) if !r.is_error() && outcome.error.is_none() => UsageStatus::Success,
            _ => UsageStatus::Failed,
        };
        analyzer
            .update_record(record, response.and_then(|r| r.usage.as_ref()), status)
            .await?;
        save_ledger(&ledger, &ledger_path).await?;
        info!(id = ?record.id, %status, path = %ledger_path.display(), "Recorded usage");

        if let Some(key) = DailyKey::of(record) {
            if let Some(row) = aggregator.get(&key).await {
                debug!(
                    user = %key.user_id,
                    requests = row.api_requests,
                    total_tokens = row.total_tokens,
                    "Daily usage this run"
                );
            }
        }
    }

    match outcome.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Saves the ledger, retrying once on a transient failure.
async fn save_ledger(ledger: &UsageLedger, path: &Path) -> Result<()> {
    match ledger.save(path).await {
        Err(e) if e.is_transient() => {
            warn!(error = %e, path = %path.display(), "Saving usage ledger failed, retrying");
            ledger.save(path).await?;
        }
        other => other?,
    }
    Ok(())
}

async fn send(orchestrator: &RequestOrchestrator, request: AiRequest, cli: &Cli) -> Outcome {
    let response = match orchestrator.send_request(request).await {
        Ok(response) => response,
        Err(e) => {
            return Outcome {
                response: None,
                error: Some(e.into()),
            };
        }
    };

    let printed = match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_response(&response));
            Ok(())
        }
        OutputFormat::Json => JsonFormatter::new(cli.pretty)
            .format(&response)
            .map(|json| println!("{json}")),
    };

    Outcome {
        response: Some(response),
        error: printed.err(),
    }
}

async fn stream(orchestrator: &Arc<RequestOrchestrator>, request: AiRequest, cli: &Cli) -> Outcome {
    let formatter = TextFormatter::new(!cli.no_color);
    let chunks = orchestrator.stream_request(request);
    let mut chunks = std::pin::pin!(chunks);

    let mut terminal = None;
    let mut stdout = std::io::stdout();

    while let Some(item) = chunks.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                return Outcome {
                    response: terminal,
                    error: Some(e.into()),
                };
            }
        };

        let line = match cli.format {
            OutputFormat::Text => Ok(formatter.format_chunk(&chunk)),
            OutputFormat::Json => JsonFormatter::format_chunk(&chunk).map(|json| json + "\n"),
        };
        match line {
            Ok(line) => {
                if let Err(e) = write!(stdout, "{line}").and_then(|()| stdout.flush()) {
                    warn!(error = %e, "Failed to write chunk");
                }
            }
            Err(e) => warn!(error = %e, "Failed to format chunk"),
        }

        if chunk.is_done {
            terminal = Some(chunk);
        }
    }

    if cli.format == OutputFormat::Text {
        println!();
    }

    Outcome {
        response: terminal,
        error: None,
    }
}
