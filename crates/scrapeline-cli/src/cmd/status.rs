//! Status subcommand - resume point of an output directory

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use scrapeline_core::{batch_filename, fmt_num, is_valid_parquet, list_batches, missing_batches};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output directory to inspect (default: configured output dir)
    pub dir: Option<PathBuf>,

    /// Input CSV, to report how many batches remain
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Records per batch used for the run
    #[arg(short, long)]
    pub batch_size: Option<usize>,
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let dir = args
        .dir
        .unwrap_or_else(|| config.output.default_dir.clone());

    let mut completed = list_batches(&dir)?;
    completed.sort_unstable();
    let last = completed.last().copied().unwrap_or(0);
    let missing = missing_batches(&completed);
    let corrupt: Vec<usize> = completed
        .iter()
        .copied()
        .filter(|&i| !is_valid_parquet(&dir.join(batch_filename(i))))
        .collect();

    let mut rows = vec![
        ("Directory", dir.display().to_string()),
        ("Batches on disk", completed.len().to_string()),
        ("Last batch", last.to_string()),
        ("Next batch", last.saturating_add(1).to_string()),
    ];
    if !missing.is_empty() {
        rows.push(("Gaps", format!("{missing:?}")));
    }
    if !corrupt.is_empty() {
        rows.push(("Unreadable", format!("{corrupt:?}")));
    }

    if let Some(input) = &args.input {
        let ids = scrapeline_ouedkniss::load_ids(input)?;
        let batch_size = args.batch_size.unwrap_or(config.fetch.batch_size).max(1);
        let total = ids.len().div_ceil(batch_size);
        let remaining = scrapeline_ouedkniss::plan_batches(ids.len(), batch_size, last.saturating_add(1));
        rows.push(("IDs", fmt_num(ids.len())));
        rows.push(("Total batches", total.to_string()));
        rows.push(("Remaining batches", remaining.len().to_string()));
    }

    print_summary("Status", &rows);

    if !corrupt.is_empty() {
        log::warn!("Delete unreadable batch files and rerun fetch to rebuild them");
    }
    Ok(())
}
