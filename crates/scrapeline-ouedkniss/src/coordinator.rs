//! Batch coordinator: bounded concurrent fetches, order-preserving collection,
//! one atomic write per batch.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use indicatif::ProgressBar;
use scrapeline_core::{
    BatchSink, FlatRecord, ORIGINAL_ID, RawResult, SharedProgress, Transport, WorkQueue, flatten,
};
use serde_json::Value;

use crate::error::PipelineError;
use crate::fetcher::Fetcher;

/// Counters for one written batch
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BatchStats {
    pub records: usize,
    pub documents: usize,
    pub empties: usize,
    pub errors: usize,
    pub elapsed: Duration,
}

impl BatchStats {
    /// Counters for a single fetch outcome
    fn of(raw: &RawResult) -> Self {
        let mut stats = Self {
            records: 1,
            ..Self::default()
        };
        if raw.is_error() {
            stats.errors = 1;
        } else if raw.is_empty() {
            stats.empties = 1;
        } else {
            stats.documents = 1;
        }
        stats
    }

    fn add(&mut self, other: &Self) {
        self.records += other.records;
        self.documents += other.documents;
        self.empties += other.empties;
        self.errors += other.errors;
    }
}

type Slot = OnceLock<(BatchStats, FlatRecord)>;

/// Runs one batch at a time through at most `concurrency` in-flight fetches.
pub struct BatchCoordinator<T, S> {
    fetcher: Fetcher<T>,
    sink: S,
    concurrency: usize,
    progress: SharedProgress,
    shutdown: &'static AtomicBool,
}

impl<T: Transport, S: BatchSink> BatchCoordinator<T, S> {
    pub fn new(
        fetcher: Fetcher<T>,
        sink: S,
        concurrency: usize,
        progress: SharedProgress,
        shutdown: &'static AtomicBool,
    ) -> Self {
        Self {
            fetcher,
            sink,
            concurrency: concurrency.max(1),
            progress,
            shutdown,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Fetch every id of the batch, flatten, tag with `original_id` and
    /// persist the records in input order as unit `batch_index`.
    ///
    /// On shutdown the in-flight fetches drain, nothing is written and
    /// [`PipelineError::Interrupted`] is returned.
    pub async fn process_batch(
        &self,
        ids: &[String],
        batch_index: usize,
    ) -> Result<BatchStats, PipelineError> {
        let start = Instant::now();
        let queue = WorkQueue::new(ids);
        let slots: Vec<Slot> = ids.iter().map(|_| OnceLock::new()).collect();
        let bar = self.progress.batch_bar(batch_index, ids.len());

        let workers = self.concurrency.min(ids.len());
        join_all((0..workers).map(|_| self.worker(&queue, &slots, &bar))).await;
        bar.finish_and_clear();

        if self.shutdown_requested() {
            return Err(PipelineError::Interrupted { batch_index });
        }

        let mut stats = BatchStats::default();
        let mut records = Vec::with_capacity(ids.len());
        for slot in slots {
            let Some((counted, record)) = slot.into_inner() else {
                return Err(PipelineError::Interrupted { batch_index });
            };
            stats.add(&counted);
            records.push(record);
        }

        self.sink.write_batch(batch_index, &records)?;
        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    async fn worker(&self, queue: &WorkQueue<'_, String>, slots: &[Slot], bar: &ProgressBar) {
        while !self.shutdown_requested() {
            let Some((pos, id)) = queue.claim() else {
                break;
            };
            let raw = self.fetcher.fetch(id, pos).await;
            let counted = BatchStats::of(&raw);
            let mut record = flatten(raw);
            record.insert(ORIGINAL_ID.to_string(), Value::String(id.clone()));
            // Each position is claimed once, so the slot is always vacant
            let _ = slots[pos].set((counted, record));
            bar.inc(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stats_by_outcome() {
        let mut stats = BatchStats::default();
        for raw in [
            RawResult::Document(json!({"id": "1"})),
            RawResult::Empty,
            RawResult::exhausted("3", 5),
            RawResult::Document(json!({"id": "4"})),
        ] {
            stats.add(&BatchStats::of(&raw));
        }
        assert_eq!(stats.records, 4);
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.empties, 1);
        assert_eq!(stats.errors, 1);
    }
}
