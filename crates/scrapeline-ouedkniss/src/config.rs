//! Announcement-details pipeline configuration

use std::path::PathBuf;
use std::time::Duration;

/// Default GraphQL endpoint serving announcement details
pub const DEFAULT_ENDPOINT: &str = "https://www.ouedkniss.com/graphql";

/// Runtime configuration for the fetch pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `batch_{n}.parquet` units
    pub output_dir: PathBuf,
    /// GraphQL endpoint URL
    pub endpoint: String,
    /// Records per output unit
    pub batch_size: usize,
    /// Max in-flight fetches within one batch
    pub concurrency: usize,
    /// Attempts per identifier before recording a failure
    pub max_retries: u32,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Proxy URLs, assigned by `slot mod len`; empty = direct
    pub proxies: Vec<String>,
    /// Zstd compression level for parquet output
    pub zstd_level: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/api_details"),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            batch_size: 1000,
            concurrency: 25,
            max_retries: 5,
            timeout: Duration::from_secs(12),
            proxies: Vec::new(),
            zstd_level: 3,
        }
    }
}

impl Config {
    /// Reject settings that would make the pipeline spin or stall
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.batch_size > 0, "batch_size must be at least 1");
        anyhow::ensure!(self.concurrency > 0, "concurrency must be at least 1");
        anyhow::ensure!(self.max_retries > 0, "max_retries must be at least 1");
        anyhow::ensure!(!self.timeout.is_zero(), "timeout must be non-zero");
        Ok(())
    }
}
