//! `channel-relay`: mirrors a public channel to a page feed or an RSS file.
//!
//! # Commands
//!
//! - `publish` - scrape the channel preview and post new items to the page
//! - `feed` - scrape the channel preview and write new items to an RSS file
//! - `relay-feed` - read an RSS feed and post new items to the page
//!
//! Settings come from the environment; see `RelayConfig`.

mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use relay_engine::RelayConfig;

use commands::SourceKind;
use logging::LogDestination;

/// Channel relay with watermark-based deduplication.
#[derive(Parser)]
#[command(name = "channel-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Append log output to this file as well as the terminal
    #[arg(global = true, long)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the channel and publish new posts to the page
    Publish,
    /// Scrape the channel and write new posts to the RSS file
    Feed,
    /// Read the RSS feed and publish new entries to the page
    RelayFeed,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let destination = match cli.log_file {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    logging::initialize(destination, cli.verbose);
    relay_logging::set_run_id(run_id());

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(err) => return commands::config_failure(&err),
    };

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(err) => {
            relay_logging::relay_error!("stage=startup error=\"{:#}\"", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &RelayConfig) -> anyhow::Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let code = runtime.block_on(async {
        match command {
            Commands::Publish => commands::publish(config, SourceKind::ChannelPage).await,
            Commands::Feed => commands::feed(config).await,
            Commands::RelayFeed => commands::publish(config, SourceKind::Feed).await,
        }
    });
    Ok(code)
}

/// Seconds since the epoch; distinct enough to tell scheduled runs apart.
fn run_id() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}
