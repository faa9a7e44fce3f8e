//! Models command - show the catalog of a usage type.

use anyhow::Result;
use clap::Args;
use modelgate_core::UsageType;

use super::Gateway;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the models command.
#[derive(Args, Default)]
pub struct ModelsArgs {
    /// Show the external-app catalog instead of the default one.
    #[arg(long, short)]
    pub external: bool,
}

impl ModelsArgs {
    /// Returns the selected usage type.
    pub fn usage_type(&self) -> UsageType {
        if self.external {
            UsageType::ExternalApp
        } else {
            UsageType::Default
        }
    }
}

/// Runs the models command.
pub async fn run(args: &ModelsArgs, cli: &Cli) -> Result<()> {
    let gateway = Gateway::open(cli).await?;
    let catalog = gateway.catalog.catalog(args.usage_type()).await?;
    let summary = catalog.summary();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_catalog(&summary));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&summary)?);
        }
    }

    Ok(())
}
