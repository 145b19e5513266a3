//! Fatal pipeline errors.
//!
//! Per-identifier failures never show up here: they are recorded as data in
//! the batch output. These variants abort the whole run.

use std::path::PathBuf;

use scrapeline_core::{SinkError, TransportError};

#[derive(Debug)]
pub enum PipelineError {
    /// Input has no `id` column
    MissingIdColumn { path: Option<PathBuf> },
    /// Input could not be read or parsed
    Input(csv::Error),
    /// HTTP client could not be built
    Transport(TransportError),
    /// A batch unit could not be persisted or listed
    Sink(SinkError),
    /// Shutdown requested while `batch_index` was in flight; nothing written for it
    Interrupted { batch_index: usize },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingIdColumn { path: Some(p) } => {
                write!(f, "{} must contain column 'id'", p.display())
            }
            Self::MissingIdColumn { path: None } => f.write_str("input must contain column 'id'"),
            Self::Input(e) => write!(f, "cannot read input: {e}"),
            Self::Transport(e) => write!(f, "{e}"),
            Self::Sink(e) => write!(f, "cannot persist batch: {e}"),
            Self::Interrupted { batch_index } => {
                write!(f, "interrupted during batch {batch_index}")
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Input(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::Sink(e) => Some(e),
            Self::MissingIdColumn { .. } | Self::Interrupted { .. } => None,
        }
    }
}

impl From<SinkError> for PipelineError {
    fn from(e: SinkError) -> Self {
        Self::Sink(e)
    }
}

impl From<TransportError> for PipelineError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        Self::Input(e)
    }
}

impl PipelineError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}
