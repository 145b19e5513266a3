//! Scrapeline Core - Common infrastructure for batch fetch pipelines
//!
//! This crate provides the source-agnostic pieces: fetch outcomes and their
//! flattening, retry policy, the HTTP transport seam, batch sinks with
//! atomic writes, and resume-point derivation.

pub mod checkpoint;
pub mod error;
pub mod flatten;
pub mod http;
pub mod logging;
pub mod progress;
pub mod record;
pub mod retry;
pub mod shutdown;
pub mod sink;
pub mod table;
pub mod work_queue;

// Re-exports for convenience
pub use checkpoint::{last_completed_batch, missing_batches, resume_batch};
pub use error::SinkError;
pub use flatten::flatten;
pub use http::{HttpResponse, ReqwestTransport, Transport, TransportError, proxy_for_slot};
pub use logging::init_logging;
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use record::{FlatRecord, ORIGINAL_ID, RawResult};
pub use retry::{RetryPolicy, backoff_delay};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, shutdown_flag};
pub use sink::{
    BatchSink, ParquetBatchSink, batch_filename, cleanup_tmp_files, is_valid_parquet, list_batches,
};
pub use work_queue::WorkQueue;
