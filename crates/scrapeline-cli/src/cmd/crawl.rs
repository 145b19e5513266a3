//! Crawl subcommand - collect announcement ids from search listings

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use scrapeline_core::{ReqwestTransport, fmt_num, shutdown_flag};
use scrapeline_ouedkniss::listing::{CrawlOptions, ListingCrawler, browser_headers, write_csv};

use super::{print_summary, runtime};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Output CSV path
    #[arg(short, long, default_value = "immobilier.csv")]
    pub output: PathBuf,

    /// Category slug to list
    #[arg(long)]
    pub category: Option<String>,

    /// Stop after this many pages
    #[arg(short = 'l', long)]
    pub max_pages: Option<u32>,

    /// Search GraphQL endpoint
    #[arg(long)]
    pub endpoint: Option<String>,
}

pub fn run(args: CrawlArgs, config: &Config) -> Result<()> {
    let category = args
        .category
        .unwrap_or_else(|| config.crawl.category.clone());
    let endpoint = args
        .endpoint
        .unwrap_or_else(|| config.crawl.endpoint.clone());

    let transport = ReqwestTransport::with_headers(&endpoint, &[], 1, browser_headers(&category))
        .context("Failed to build HTTP client")?;
    let options = CrawlOptions {
        category: category.clone(),
        max_pages: args.max_pages,
        page_delay: Duration::from_millis(config.crawl.page_delay_ms),
        timeout: Duration::from_secs(config.crawl.timeout_secs),
    };
    let crawler = ListingCrawler::new(transport, options, shutdown_flag());

    log::info!("Crawling category '{category}' from {endpoint}");
    let rows = runtime()?.block_on(crawler.crawl())?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    write_csv(&rows, BufWriter::new(file))?;
    log::info!("Saved {} rows to {}", rows.len(), args.output.display());

    print_summary(
        "Crawl",
        &[
            ("Category", category),
            ("Rows", fmt_num(rows.len())),
            ("Output", args.output.display().to_string()),
        ],
    );
    Ok(())
}
