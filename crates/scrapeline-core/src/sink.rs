//! Batch sinks: one atomic output unit per batch index

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::error::SinkError;
use crate::record::FlatRecord;
use crate::table::records_to_batch;

/// Destination for completed batches.
///
/// A unit is either fully written under its index or absent; implementations
/// must never expose a partial unit to [`completed_batches`](BatchSink::completed_batches).
pub trait BatchSink: Send + Sync {
    /// Persist `records` as the unit tagged `batch_index`
    fn write_batch(&self, batch_index: usize, records: &[FlatRecord]) -> Result<(), SinkError>;

    /// Indices of all persisted units, in no particular order
    fn completed_batches(&self) -> Result<Vec<usize>, SinkError>;
}

/// Parquet files `batch_{n}.parquet` in one directory, written via tmp → rename
#[derive(Debug)]
pub struct ParquetBatchSink {
    output_dir: PathBuf,
    zstd_level: i32,
}

/// Filename prefix of persisted batch units
pub const BATCH_PREFIX: &str = "batch_";

/// Filename of the unit for `batch_index`
pub fn batch_filename(batch_index: usize) -> String {
    format!("{BATCH_PREFIX}{batch_index}.parquet")
}

/// Batch index from a unit filename (`batch_12.parquet` → 12)
pub fn parse_batch_index(filename: &str) -> Option<usize> {
    filename
        .strip_prefix(BATCH_PREFIX)?
        .strip_suffix(".parquet")?
        .parse()
        .ok()
}

impl ParquetBatchSink {
    /// Create the output directory if needed and clear stale tmp files
    pub fn new(output_dir: impl Into<PathBuf>, zstd_level: i32) -> Result<Self, SinkError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        cleanup_tmp_files(&output_dir)?;
        Ok(Self {
            output_dir,
            zstd_level,
        })
    }

    pub fn batch_path(&self, batch_index: usize) -> PathBuf {
        self.output_dir.join(batch_filename(batch_index))
    }

    fn writer_props(&self) -> Result<WriterProperties, SinkError> {
        let level = ZstdLevel::try_new(self.zstd_level)?;
        Ok(WriterProperties::builder()
            .set_compression(Compression::ZSTD(level))
            .build())
    }
}

impl BatchSink for ParquetBatchSink {
    fn write_batch(&self, batch_index: usize, records: &[FlatRecord]) -> Result<(), SinkError> {
        let batch = records_to_batch(records)?;
        let final_path = self.batch_path(batch_index);
        let tmp_path = self
            .output_dir
            .join(format!("{}.tmp", batch_filename(batch_index)));

        let result = (|| -> Result<(), SinkError> {
            let file = File::create(&tmp_path)?;
            let props = self.writer_props()?;
            let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
            writer.write(&batch)?;
            writer.close()?;
            fs::rename(&tmp_path, &final_path)?;
            Ok(())
        })();

        if result.is_err() && tmp_path.exists() {
            // Next run's cleanup would catch it too
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    fn completed_batches(&self) -> Result<Vec<usize>, SinkError> {
        list_batches(&self.output_dir)
    }
}

/// Batch indices of the `batch_{n}.parquet` files in `output_dir`, unsorted.
///
/// Read-only: does not create the directory or touch tmp files. A missing
/// directory lists as empty.
pub fn list_batches(output_dir: &Path) -> Result<Vec<usize>, SinkError> {
    let pattern = output_dir.join(format!("{BATCH_PREFIX}*.parquet"));
    let pattern = pattern.to_string_lossy();
    let paths = glob::glob(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let mut indices = Vec::new();
    for path in paths {
        let path = path.map_err(glob::GlobError::into_error)?;
        let index = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_batch_index);
        match index {
            Some(i) => indices.push(i),
            None => log::debug!("ignoring unrecognized file {}", path.display()),
        }
    }
    Ok(indices)
}

/// Check if a completed parquet file exists and has a valid footer
pub fn is_valid_parquet(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };
    parquet::file::reader::SerializedFileReader::new(file).is_ok()
}

/// Remove stale .tmp files left by an interrupted batch write
pub fn cleanup_tmp_files(output_dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
