//! Fetch subcommand - announcement details for a CSV of ids

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use scrapeline_core::{SharedProgress, fmt_num};

use super::{print_summary, runtime};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// CSV file with an `id` column
    pub input: PathBuf,

    /// Output directory for batch_{n}.parquet files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Records per output batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Concurrent requests within a batch
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Attempts per id before recording a failure
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Per-attempt timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Proxy URLs (comma-separated), rotated by position in the batch
    #[arg(long, value_delimiter = ',')]
    pub proxies: Option<Vec<String>>,

    /// GraphQL endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Zstd compression level (1-22)
    #[arg(short, long)]
    pub zstd_level: Option<i32>,
}

fn pipeline_config(args: FetchArgs, config: &Config) -> scrapeline_ouedkniss::Config {
    let fetch = &config.fetch;
    scrapeline_ouedkniss::Config {
        output_dir: args
            .output
            .unwrap_or_else(|| config.output.default_dir.clone()),
        endpoint: args.endpoint.unwrap_or_else(|| fetch.endpoint.clone()),
        batch_size: args.batch_size.unwrap_or(fetch.batch_size),
        concurrency: args.concurrency.unwrap_or(fetch.concurrency),
        max_retries: args.max_retries.unwrap_or(fetch.max_retries),
        timeout: Duration::from_secs(args.timeout.unwrap_or(fetch.timeout_secs)),
        proxies: args.proxies.unwrap_or_else(|| fetch.proxies.clone()),
        zstd_level: args.zstd_level.unwrap_or(config.output.compression_level),
    }
}

pub fn run(args: FetchArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let input = args.input.clone();
    let fetch_config = pipeline_config(args, config);
    fetch_config.validate()?;

    log::info!("Fetching announcement details");
    log::info!("  Input: {}", input.display());
    log::info!("  Output: {}", fetch_config.output_dir.display());
    log::info!(
        "  Batch size: {}, concurrency: {}",
        fetch_config.batch_size,
        fetch_config.concurrency
    );

    let summary = runtime()?.block_on(scrapeline_ouedkniss::run(
        &fetch_config,
        &input,
        progress.clone(),
    ))?;

    print_summary(
        "Fetch",
        &[
            ("IDs", fmt_num(summary.total_ids)),
            ("Started at batch", summary.start_batch.to_string()),
            ("Batches written", summary.batches_written.to_string()),
            ("Records", fmt_num(summary.records)),
            ("Documents", fmt_num(summary.documents)),
            ("Empty", fmt_num(summary.empties)),
            ("Errors", fmt_num(summary.errors)),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
            ("Output", fetch_config.output_dir.display().to_string()),
        ],
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &str) -> FetchArgs {
        FetchArgs {
            input: input.into(),
            output: None,
            batch_size: None,
            concurrency: None,
            max_retries: None,
            timeout: None,
            proxies: None,
            endpoint: None,
            zstd_level: None,
        }
    }

    #[test]
    fn config_file_values_used_by_default() {
        let mut config = Config::default();
        config.fetch.batch_size = 50;
        config.fetch.proxies = vec!["http://p1:8080".into()];
        let resolved = pipeline_config(args("ids.csv"), &config);
        assert_eq!(resolved.batch_size, 50);
        assert_eq!(resolved.proxies, vec!["http://p1:8080"]);
        assert_eq!(resolved.output_dir, PathBuf::from("data/api_details"));
        assert_eq!(resolved.timeout, Duration::from_secs(12));
    }

    #[test]
    fn flags_override_config() {
        let config = Config::default();
        let resolved = pipeline_config(
            FetchArgs {
                batch_size: Some(10),
                concurrency: Some(3),
                output: Some("out".into()),
                ..args("ids.csv")
            },
            &config,
        );
        assert_eq!(resolved.batch_size, 10);
        assert_eq!(resolved.concurrency, 3);
        assert_eq!(resolved.output_dir, PathBuf::from("out"));
    }
}
