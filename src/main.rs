//! Command-line entry point for `drywatch`.
//!
//! `drywatch run` (the default, meant for a daily cron job) performs one
//! pipeline run and prints the resulting snapshot as JSON. `drywatch serve`
//! exposes the latest snapshot and history read-only over HTTP.
//!
//! # Environment Variables
//! Pipeline settings are documented on [`drywatch::config::load_from_env`].
//! Logging is controlled by:
//! - `RUST_LOG` – full filter directive, takes precedence when set
//! - `DRYWATCH_LOG_LEVEL` (optional) – drywatch's log level (default: `info`),
//!   raised by `-v`
//! - `DRYWATCH_SPAN_EVENTS` (optional) – span event mode for tracing
//! - `FORCE_COLOR` (optional) – force ANSI colors on or off
use std::{env, io::IsTerminal, net::SocketAddr};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use drywatch::clock::SystemClock;
use drywatch::routes;
use drywatch::store::{HistoryStore, SnapshotWriter};
use drywatch::{config, Runner};

// ---

#[derive(Debug, Parser)]
#[command(name = "drywatch", version, about = "Daily drying and wind risk classification")]
struct Cli {
    /// Raise drywatch's log level one step per use
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch, classify and record one day (default)
    Run {
        /// Reference date (YYYY-MM-DD); windows end the day before
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Serve the latest snapshot and history over HTTP
    Serve {
        /// Listen address, overrides SERVE_ADDR
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_from_env()?;
    cfg.log_config();

    match cli.command.unwrap_or(Command::Run { date: None }) {
        Command::Run { date } => {
            let runner = Runner::from_config(cfg.clone(), SystemClock::new(cfg.utc_offset))?;
            let reference_date = date.unwrap_or_else(|| runner.reference_date());

            let assessment = runner
                .run_for(reference_date)
                .await
                .with_context(|| format!("Run for {reference_date} failed"))?;

            println!(
                "{}",
                serde_json::to_string_pretty(&assessment.to_snapshot())?
            );
        }
        Command::Serve { addr } => {
            let addr = addr.unwrap_or(cfg.serve_addr);
            let app = routes::router(
                SnapshotWriter::new(cfg.snapshot_path.clone()),
                HistoryStore::new(cfg.history_path.clone()),
            );

            tracing::info!("Listening on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

// ---

/// Install the global `tracing` subscriber, writing to stderr so stdout
/// carries only the run's JSON.
///
/// `RUST_LOG` replaces the filter outright. Otherwise dependencies log at
/// `warn` and `drywatch` at `DRYWATCH_LOG_LEVEL`, raised one step per `-v`.
/// `FORCE_COLOR` and `DRYWATCH_SPAN_EVENTS` (`full`, `enter_exit`) tune the
/// output.
fn init_tracing(verbose: u8) {
    // ---
    let span_events = match env::var("DRYWATCH_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stderr().is_terminal(),
    };

    let env_filter = match env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(crate_filter(
            env::var("DRYWATCH_LOG_LEVEL").ok().as_deref(),
            verbose,
        )),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Filter directive for this crate: the configured level (default `info`)
/// raised by `verbose` steps, capped at `trace`.
fn crate_filter(configured: Option<&str>, verbose: u8) -> String {
    // ---
    let base = configured
        .and_then(|name| LEVELS.iter().position(|l| l.eq_ignore_ascii_case(name.trim())))
        .unwrap_or(2);
    let level = LEVELS[(base + verbose as usize).min(LEVELS.len() - 1)];
    format!("warn,drywatch={level}")
}
