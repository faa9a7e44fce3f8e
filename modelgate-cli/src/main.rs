// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! modelgate CLI - inspect and exercise a gateway configuration.
//!
//! # Examples
//!
//! ```bash
//! # Write a starter configuration
//! modelgate init
//!
//! # Show the default catalog
//! modelgate models
//!
//! # Show the external-app catalog as JSON
//! modelgate models --external --format json --pretty
//!
//! # Explain how a model id resolves
//! modelgate resolve gpt-4o
//!
//! # Show adapter resolution for every provider
//! modelgate adapters
//!
//! # Monthly token totals from the usage ledger
//! modelgate usage --month 2026-10
//!
//! # Send a prompt
//! modelgate send gpt-4o "Hello there" --stream
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use modelgate_dispatch::DispatchError;
use modelgate_providers::CatalogError;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{adapters, init, models, resolve, send, usage};

// ============================================================================
// CLI Definition
// ============================================================================

/// modelgate CLI - inspect and exercise a gateway configuration.
#[derive(Parser)]
#[command(name = "modelgate")]
#[command(about = "LLM gateway configuration CLI")]
#[command(long_about = r"
modelgate routes chat requests to configured LLM providers.

This tool reads the gateway configuration and shows what the gateway
would do with it: which models are visible, which provider and adapter
serve a model, and how many tokens went where.

Examples:
  modelgate init                 # Write a starter config
  modelgate models               # Default catalog
  modelgate models --external    # External-app catalog
  modelgate resolve gpt-4o       # Model -> provider -> adapter
  modelgate adapters             # Adapter resolution per provider
  modelgate usage                # Token totals this month
")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (YAML or JSON).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show the model catalog of a usage type.
    #[command(visible_alias = "m")]
    Models(models::ModelsArgs),

    /// Show how a model id resolves to a provider and adapter.
    #[command(visible_alias = "r")]
    Resolve(resolve::ResolveArgs),

    /// Show adapter resolution for every active provider.
    #[command(visible_alias = "a")]
    Adapters,

    /// Show token totals from the usage ledger.
    #[command(visible_alias = "u")]
    Usage(usage::UsageArgs),

    /// Send a prompt through the gateway.
    Send(send::SendArgs),

    /// Write a starter configuration.
    Init(init::InitArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// The configuration does not build a valid catalog.
    InvalidConfig = 2,
    /// The requested model is not available.
    ModelUnavailable = 3,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    fn for_error(err: &anyhow::Error) -> Self {
        let catalog = err.downcast_ref::<CatalogError>().or_else(|| {
            err.downcast_ref::<DispatchError>().and_then(|e| match e {
                DispatchError::Catalog(inner) => Some(inner),
                _ => None,
            })
        });

        match catalog {
            Some(CatalogError::ModelNotAvailable(_)) => Self::ModelUnavailable,
            Some(e) if e.is_configuration_error() => Self::InvalidConfig,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("modelgate=debug,info")
    } else {
        EnvFilter::new("modelgate=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Models(args) => models::run(args, &cli).await,
        Commands::Resolve(args) => resolve::run(args, &cli).await,
        Commands::Adapters => adapters::run(&cli).await,
        Commands::Usage(args) => usage::run(args, &cli).await,
        Commands::Send(args) => send::run(args, &cli).await,
        Commands::Init(args) => init::run(args, &cli),
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    std::process::exit(ExitCode::Success as i32);
}
