//! Scrapeline Ouedkniss - announcement details pipeline
//!
//! Fetches announcement details for a list of ids from the GraphQL API,
//! flattens each document and writes fixed-size batches to Parquet.
//!
//! # Features
//!
//! - Bounded concurrency per batch, output in input order
//! - Linear-backoff retries with optional proxy rotation
//! - Resume from the last persisted batch after interruption
//! - Listing crawler that produces the id CSV
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use scrapeline_core::ProgressContext;
//! use scrapeline_ouedkniss::{Config, run};
//!
//! let config = Config {
//!     output_dir: "data/api_details".into(),
//!     ..Default::default()
//! };
//!
//! let summary = run(&config, "immobilier.csv".as_ref(), Arc::new(ProgressContext::new())).await?;
//! println!("Wrote {} batches", summary.batches_written);
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod input;
pub mod listing;
pub mod query;
pub mod runner;

// Re-exports
pub use config::Config;
pub use coordinator::{BatchCoordinator, BatchStats};
pub use error::PipelineError;
pub use fetcher::Fetcher;
pub use input::{load_ids, read_ids};
pub use listing::{CrawlOptions, ListingCrawler, ListingRow};
pub use runner::{Pipeline, Summary, plan_batches, run};
