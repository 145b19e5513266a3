//! Pipeline driver: input → resume point → sequential batches

use std::ops::Range;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use scrapeline_core::{
    BatchSink, ParquetBatchSink, ReqwestTransport, SharedProgress, Transport, fmt_num,
    resume_batch, shutdown_flag,
};

use crate::config::Config;
use crate::coordinator::{BatchCoordinator, BatchStats};
use crate::error::PipelineError;
use crate::fetcher::Fetcher;
use crate::input::load_ids;

/// Pipeline execution summary
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Summary {
    pub total_ids: usize,
    /// First batch index processed by this run
    pub start_batch: usize,
    pub batches_written: usize,
    pub records: usize,
    pub documents: usize,
    pub empties: usize,
    pub errors: usize,
    pub elapsed: Duration,
}

impl Summary {
    fn add(&mut self, stats: &BatchStats) {
        self.batches_written += 1;
        self.records += stats.records;
        self.documents += stats.documents;
        self.empties += stats.empties;
        self.errors += stats.errors;
    }

    pub fn log(&self) {
        log::info!("=== Fetch Summary ===");
        log::info!(
            "Batches: {} written (from batch {})",
            self.batches_written,
            self.start_batch
        );
        log::info!(
            "Records: {} ({} documents, {} empty, {} errors)",
            fmt_num(self.records),
            fmt_num(self.documents),
            fmt_num(self.empties),
            fmt_num(self.errors)
        );
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Batch index and id range for every batch from `start_batch` on.
///
/// Batch `i` (1-based) covers ids `[(i-1)*size, min(i*size, total))`.
pub fn plan_batches(total: usize, batch_size: usize, start_batch: usize) -> Vec<(usize, Range<usize>)> {
    if batch_size == 0 {
        return Vec::new();
    }
    let start_batch = start_batch.max(1);
    let total_batches = total.div_ceil(batch_size);
    (start_batch..=total_batches)
        .map(|i| {
            let lo = (i - 1) * batch_size;
            (i, lo..(lo + batch_size).min(total))
        })
        .collect()
}

/// Sequential driver over a [`BatchCoordinator`]
pub struct Pipeline<T, S> {
    coordinator: BatchCoordinator<T, S>,
    batch_size: usize,
}

impl<T: Transport, S: BatchSink> Pipeline<T, S> {
    pub fn new(coordinator: BatchCoordinator<T, S>, batch_size: usize) -> Self {
        Self {
            coordinator,
            batch_size,
        }
    }

    pub fn coordinator(&self) -> &BatchCoordinator<T, S> {
        &self.coordinator
    }

    /// Process every batch after the last persisted one.
    ///
    /// Batches run strictly one after another; a later batch never starts
    /// before the earlier one is persisted.
    pub async fn run(&self, ids: &[String]) -> Result<Summary, PipelineError> {
        let start = Instant::now();
        let start_batch = resume_batch(self.coordinator.sink())?;
        let plan = plan_batches(ids.len(), self.batch_size, start_batch);

        let mut summary = Summary {
            total_ids: ids.len(),
            start_batch,
            ..Default::default()
        };

        if plan.is_empty() {
            log::info!(
                "Nothing to fetch: {} ids already covered up to batch {}",
                fmt_num(ids.len()),
                start_batch - 1
            );
        } else if start_batch > 1 {
            log::info!("Resuming from batch {start_batch}");
        }

        for (batch_index, range) in plan {
            if self.coordinator.shutdown_requested() {
                return Err(PipelineError::Interrupted { batch_index });
            }
            log::info!("Starting batch {batch_index} ({} IDs)", range.len());
            let stats = match self.coordinator.process_batch(&ids[range], batch_index).await {
                Ok(stats) => stats,
                Err(PipelineError::Sink(e)) if e.is_storage_full() => {
                    log::error!("Out of disk space writing batch {batch_index}; free space and rerun");
                    return Err(PipelineError::Sink(e));
                }
                Err(e) => return Err(e),
            };
            log::info!(
                "Saved batch {batch_index}: {} records ({} errors) in {:.1}s",
                stats.records,
                stats.errors,
                stats.elapsed.as_secs_f64()
            );
            summary.add(&stats);
        }

        log::info!("All batches completed successfully.");
        summary.elapsed = start.elapsed();
        Ok(summary)
    }
}

/// Build the production pipeline from `config`
pub fn build(
    config: &Config,
    progress: SharedProgress,
    shutdown: &'static AtomicBool,
) -> Result<Pipeline<ReqwestTransport, ParquetBatchSink>, PipelineError> {
    let transport = ReqwestTransport::new(&config.endpoint, &config.proxies, config.concurrency)?;
    let sink = ParquetBatchSink::new(&config.output_dir, config.zstd_level)?;
    let coordinator = BatchCoordinator::new(
        Fetcher::from_config(transport, config),
        sink,
        config.concurrency,
        progress,
        shutdown,
    );
    Ok(Pipeline::new(coordinator, config.batch_size))
}

/// Load ids from `input` and run the pipeline against the live endpoint
pub async fn run(
    config: &Config,
    input: &Path,
    progress: SharedProgress,
) -> Result<Summary, PipelineError> {
    let ids = load_ids(input)?;
    log::info!(
        "Loaded {} ids from {}",
        fmt_num(ids.len()),
        input.display()
    );
    if !config.proxies.is_empty() {
        log::info!("Rotating over {} proxies", config.proxies.len());
    }
    let pipeline = build(config, progress, shutdown_flag())?;
    let summary = pipeline.run(&ids).await?;
    summary.log();
    Ok(summary)
}
