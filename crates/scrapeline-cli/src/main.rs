//! scrapeline - CLI for the classified-ads fetch pipeline
//!
//! Crawls search listings into an id CSV, then fetches each announcement's
//! details into resumable Parquet batches.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scrapeline_core::{ProgressContext, SharedProgress};

mod cmd;
mod config;

use config::Config;

/// Exit status after SIGINT/SIGTERM
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "scrapeline")]
#[command(about = "Resumable batch fetcher for classified-ad announcement details")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./scrapeline.toml or ~/.config/scrapeline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch announcement details for every id in a CSV
    Fetch(cmd::fetch::FetchArgs),
    /// Crawl search listings into an id CSV
    Crawl(cmd::crawl::CrawlArgs),
    /// Show completed batches and the resume point
    Status(cmd::status::StatusArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // Progress context (TTY auto-detect)
    let progress = Arc::new(ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    let log_file = cli.log_file.clone().or_else(|| config.log.file.clone());
    if let Err(e) = scrapeline_core::init_logging(quiet, cli.debug, multi, log_file.as_deref()) {
        eprintln!("Error: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = scrapeline_core::install_signal_handlers() {
        log::warn!("Signal handlers not installed: {e}");
    }

    let result = dispatch(cli.command, &config, &progress);

    if scrapeline_core::is_shutdown_requested() {
        log::warn!("Interrupted; completed batches are kept, rerun to resume");
        return ExitCode::from(EXIT_INTERRUPTED);
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Command, config: &Config, progress: &SharedProgress) -> Result<()> {
    match command {
        Command::Fetch(args) => cmd::fetch::run(args, config, progress),
        Command::Crawl(args) => cmd::crawl::run(args, config),
        Command::Status(args) => cmd::status::run(args, config),
        Command::Config => {
            show_config(config);
            Ok(())
        }
    }
}

fn show_config(config: &Config) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec![
        "Output directory",
        &config.output.default_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Compression level",
        &config.output.compression_level.to_string(),
    ]);
    table.add_row(vec!["Details endpoint", &config.fetch.endpoint]);
    table.add_row(vec!["Batch size", &config.fetch.batch_size.to_string()]);
    table.add_row(vec!["Concurrency", &config.fetch.concurrency.to_string()]);
    table.add_row(vec!["Max retries", &config.fetch.max_retries.to_string()]);
    table.add_row(vec!["Timeout", &format!("{}s", config.fetch.timeout_secs)]);
    table.add_row(vec![
        "Proxies",
        &if config.fetch.proxies.is_empty() {
            "none (direct)".to_string()
        } else {
            format!("{} configured", config.fetch.proxies.len())
        },
    ]);
    table.add_row(vec!["Search endpoint", &config.crawl.endpoint]);
    table.add_row(vec!["Crawl category", &config.crawl.category]);
    table.add_row(vec![
        "Page delay",
        &format!("{}ms", config.crawl.page_delay_ms),
    ]);
    table.add_row(vec![
        "Log file",
        &config
            .log
            .file
            .as_ref()
            .map_or_else(|| "stderr only".to_string(), |p| p.display().to_string()),
    ]);

    eprintln!("\n{table}");
}
