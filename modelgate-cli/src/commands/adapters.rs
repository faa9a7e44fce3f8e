//! Adapters command - show adapter resolution per provider.

use anyhow::Result;

use super::Gateway;
use crate::output::{AdapterOutput, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the adapters command.
pub async fn run(cli: &Cli) -> Result<()> {
    let gateway = Gateway::open(cli).await?;
    let resolutions = gateway.registry().validate_adapters().await?;

    match cli.format {
        OutputFormat::Text => {
            let outputs: Vec<AdapterOutput> = resolutions.iter().map(AdapterOutput::from).collect();
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_adapters(&outputs));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_adapters(&resolutions)?);
        }
    }

    if resolutions.iter().any(|r| !r.is_success()) {
        anyhow::bail!("some providers have no usable adapter");
    }
    Ok(())
}
