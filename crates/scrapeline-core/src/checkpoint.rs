//! Resume point derived from persisted batch units.
//!
//! No separate checkpoint file exists: the highest persisted batch index is
//! the checkpoint. Indices are expected to be contiguous from 1 because
//! batches are written strictly in order. A gap is reported but the max is
//! still trusted, so a hand-deleted unit in the middle is not refetched.

use std::ops::RangeInclusive;

use crate::error::SinkError;
use crate::sink::BatchSink;

/// Runs of indices in `1..=max` that have no persisted unit.
///
/// Gaps are reported as ranges so a stray unit with a huge index costs one
/// entry, not one per missing batch.
pub fn missing_batches(completed: &[usize]) -> Vec<RangeInclusive<usize>> {
    let mut sorted = completed.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut gaps = Vec::new();
    let mut prev = 0usize;
    for &i in sorted.iter().filter(|&&i| i > 0) {
        if i - prev > 1 {
            gaps.push(prev + 1..=i - 1);
        }
        prev = i;
    }
    gaps
}

/// Highest persisted batch index, 0 when nothing was written yet
pub fn last_completed_batch<S: BatchSink + ?Sized>(sink: &S) -> Result<usize, SinkError> {
    let completed = sink.completed_batches()?;
    let last = completed.iter().copied().max().unwrap_or(0);

    let missing = missing_batches(&completed);
    if !missing.is_empty() {
        log::warn!(
            "Batch outputs have gaps (missing {missing:?}); resuming after batch {last} anyway"
        );
    }
    Ok(last)
}

/// Batch index to start from on the next run
pub fn resume_batch<S: BatchSink + ?Sized>(sink: &S) -> Result<usize, SinkError> {
    Ok(last_completed_batch(sink)?.saturating_add(1))
}
