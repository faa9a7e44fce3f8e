//! Resolve command - show how a model id resolves.

use anyhow::Result;
use clap::Args;
use modelgate_core::UsageType;
use tracing::debug;

use super::Gateway;
use crate::output::{JsonFormatter, ResolveOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Model id to resolve.
    pub model: String,

    /// Resolve against the external-app catalog.
    #[arg(long, short)]
    pub external: bool,

    /// Ask the provider whether the model is reachable.
    #[arg(long)]
    pub status: bool,
}

/// Runs the resolve command.
pub async fn run(args: &ResolveArgs, cli: &Cli) -> Result<()> {
    let gateway = Gateway::open(cli).await?;
    let output = resolve(&gateway, args).await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_resolution(&output));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&output)?);
        }
    }

    Ok(())
}

async fn resolve(gateway: &Gateway, args: &ResolveArgs) -> Result<ResolveOutput> {
    let usage_type = if args.external {
        UsageType::ExternalApp
    } else {
        UsageType::Default
    };

    if let Some(model) = gateway.catalog.model(&args.model, usage_type).await? {
        let status = if args.status {
            Some(model.status().await.to_string())
        } else {
            None
        };
        return Ok(ResolveOutput {
            model: model.id().to_string(),
            usage_type,
            provider: model.provider_id().to_string(),
            adapter: Some(model.provider().adapter().adapter_name().to_string()),
            in_catalog: true,
            label: Some(model.descriptor().display_label().to_string()),
            status,
        });
    }

    // Hidden or inactive models still map to a provider.
    debug!(model = %args.model, %usage_type, "Model not in catalog, asking the registry");
    let registry = gateway.registry();
    let provider_id = registry.provider_for_model(&args.model).await?;
    let adapter = match registry.provider_by_id(&provider_id).await {
        Ok(provider) => Some(provider.adapter().adapter_name().to_string()),
        Err(e) => {
            debug!(provider = %provider_id, error = %e, "Provider not constructible");
            None
        }
    };

    Ok(ResolveOutput {
        model: args.model.clone(),
        usage_type,
        provider: provider_id,
        adapter,
        in_catalog: false,
        label: None,
        status: None,
    })
}
