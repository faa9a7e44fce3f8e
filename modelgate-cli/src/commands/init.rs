//! Init command - write a starter configuration.

use anyhow::Result;
use clap::Args;
use modelgate_store::GatewayConfig;
use std::path::Path;
use tracing::info;

use super::config_path;
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the init command.
#[derive(Args, Default)]
pub struct InitArgs {
    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Runs the init command.
pub fn run(args: &InitArgs, cli: &Cli) -> Result<()> {
    let path = config_path(cli);
    write_template(&path, args.force)?;

    match cli.format {
        OutputFormat::Text => println!("Wrote starter configuration to {}", path.display()),
        OutputFormat::Json => {
            let written = serde_json::json!({ "path": path.display().to_string() });
            println!("{}", JsonFormatter::new(cli.pretty).format(&written)?);
        }
    }
    Ok(())
}

fn write_template(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite",
            path.display()
        );
    }

    GatewayConfig::template().save_to(path)?;
    info!(path = %path.display(), "Wrote starter configuration");
    Ok(())
}
