mod calendar;
mod config;
mod jobs;
mod loader;
mod models;
mod pipeline;
mod provider;
mod report;
mod server;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::jobs::JobHandle;
use crate::loader::load_holdings_file;
use crate::models::{DividendLookup, DATE_FORMAT};
use crate::pipeline::JobRunner;
use crate::provider::{lookup_latest, YahooDividendSource};
use crate::report::ReportBuilder;

#[derive(Parser)]
#[command(name = "dividend-tracker", about = "Dividend credit-date tracker", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the upload page and progress API
    Serve {
        /// Listen address (default: server.bind_addr from config)
        #[arg(short, long, env = "DIVTRACK_BIND")]
        bind: Option<SocketAddr>,
    },

    /// Build a report from a holdings file without the web server
    Run {
        /// Holdings table (.xlsx, .xls, .ods or .csv)
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the report
        #[arg(short, long, default_value = "output.xlsx")]
        output: PathBuf,
    },

    /// Show the latest dividend and projected credit date for one symbol
    Lookup { symbol: String },

    /// Project a credit date from a dividend date ("DD Mon YYYY")
    CreditDate {
        date: String,

        /// Business days to add (default: report.business_days from config)
        #[arg(short, long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "dividend_tracker=info,warn",
        1 => "dividend_tracker=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Serve { bind } => {
            let source = Arc::new(YahooDividendSource::new(&config.provider)?);
            let bind = bind.unwrap_or(config.server.bind_addr);
            server::serve(&config, source, bind).await?;
        }

        Command::Run { input, output } => {
            let holdings = load_holdings_file(&input)
                .with_context(|| format!("Failed to read holdings from {:?}", input))?;

            let source = YahooDividendSource::new(&config.provider)?;
            let report = ReportBuilder::from_config(&config.report);
            let runner = JobRunner::new(&source, &report, config.report.business_days);

            let bytes = runner.run(&holdings, &JobHandle::new(1)).await?;
            std::fs::write(&output, bytes)
                .with_context(|| format!("Failed to write report to {:?}", output))?;
            info!("Report written to {:?}", output);
        }

        Command::Lookup { symbol } => {
            let source = YahooDividendSource::new(&config.provider)?;
            match lookup_latest(&source, &symbol).await? {
                DividendLookup::Found(event) => {
                    let credit = calendar::add_business_days(event.date, config.report.business_days);
                    println!("─────────────────────────────────");
                    println!("  {}", symbol);
                    println!("─────────────────────────────────");
                    println!("  Dividend date : {}", event.date.format(DATE_FORMAT));
                    println!(
                        "  Amount/share  : {}",
                        event.amount_per_share.map(|a| a.to_string()).unwrap_or("—".into())
                    );
                    println!(
                        "  Credit date   : {}",
                        credit.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or("—".into())
                    );
                    println!("─────────────────────────────────");
                }
                DividendLookup::NoHistory => println!("{}: {}", symbol, models::NO_DIVIDEND_DATA),
                DividendLookup::InvalidDate => println!("{}: {}", symbol, models::INVALID_DIVIDEND_DATE),
            }
        }

        Command::CreditDate { date, days } => {
            let days = days.unwrap_or(config.report.business_days);
            println!("{}", calendar::likely_credit_date(&date, days));
        }
    }

    Ok(())
}
