//! Usage command - monthly token totals or one day's aggregation from the
//! usage ledger.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::Args;
use modelgate_store::{DailyUsageAggregator, GatewayConfig, UsageLedger};
use std::path::PathBuf;

use super::config_path;
use crate::output::{DailyOutput, JsonFormatter, TextFormatter, UsageOutput};
use crate::{Cli, OutputFormat};

/// Arguments for the usage command.
#[derive(Args, Default)]
pub struct UsageArgs {
    /// Ledger file. Defaults to the configured ledger path.
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Month as YYYY-MM. Defaults to the current month.
    #[arg(long, short)]
    pub month: Option<String>,

    /// Show one day (YYYY-MM-DD) per user, provider and model instead.
    #[arg(long, short, conflicts_with = "month")]
    pub day: Option<String>,
}

/// Runs the usage command.
pub async fn run(args: &UsageArgs, cli: &Cli) -> Result<()> {
    let path = match &args.ledger {
        Some(path) => path.clone(),
        None => GatewayConfig::load_from(&config_path(cli))?
            .usage
            .ledger_path(),
    };
    let ledger = UsageLedger::load(&path)
        .await
        .with_context(|| format!("failed to read ledger {}", path.display()))?;

    if let Some(day) = &args.day {
        let date = parse_day(day)?;
        let rows = DailyUsageAggregator::aggregate_day(&ledger.records_on(date).await, date);
        let output = DailyOutput::new(date, rows);
        match cli.format {
            OutputFormat::Text => {
                println!("{}", TextFormatter::new(!cli.no_color).format_daily(&output));
            }
            OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&output)?),
        }
        return Ok(());
    }

    let (year, month) = match &args.month {
        Some(text) => parse_month(text)?,
        None => {
            let today = Utc::now().date_naive();
            (today.year(), today.month())
        }
    };

    let rows = ledger.summarize_month(year, month).await;
    let output = UsageOutput::new(format!("{year:04}-{month:02}"), rows);

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_usage(&output));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&output)?);
        }
    }

    Ok(())
}

/// Parses `YYYY-MM` into year and month.
fn parse_month(text: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d")
        .with_context(|| format!("invalid month: {text}. Use YYYY-MM"))?;
    Ok((date.year(), date.month()))
}

/// Parses `YYYY-MM-DD`.
fn parse_day(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("invalid day: {text}. Use YYYY-MM-DD"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2026-10").unwrap(), (2026, 10));
        assert_eq!(parse_month("2025-01").unwrap(), (2025, 1));
    }

    #[test]
    fn test_parse_month_rejects_garbage() {
        assert!(parse_month("2026-13").is_err());
        assert!(parse_month("october").is_err());
        assert!(parse_month("").is_err());
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(
            parse_day("2026-10-18").unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
        );
        assert!(parse_day("2026-10").is_err());
        assert!(parse_day("2026-02-30").is_err());
    }
}
