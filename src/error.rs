use std::path::PathBuf;

use arrow::error::ArrowError;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every fatal condition a pipeline run can end in.
///
/// Per-field coercion failures are not here: they are recovered as nulls
/// and counted in [`crate::ingest::CoercionReport`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source unavailable: {location}")]
    SourceUnavailable {
        location: String,
        #[source]
        source: BoxError,
    },

    #[error("source {location} could not be read as CSV")]
    SourceMalformed {
        location: String,
        #[source]
        source: csv::Error,
    },

    #[error("stage input missing: no table at {}", path.display())]
    StageInputMissing { path: PathBuf },

    #[error("stage input unreadable at {}", path.display())]
    StageInputUnreadable {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to write table to {}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("building record batch")]
    Batch(#[from] ArrowError),

    #[error("starting session thread pool")]
    Session(#[from] rayon::ThreadPoolBuildError),

    #[error("stage task aborted")]
    StageAborted(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Stable name of the variant, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable { .. } => "source_unavailable",
            PipelineError::SourceMalformed { .. } => "source_malformed",
            PipelineError::StageInputMissing { .. } => "stage_input_missing",
            PipelineError::StageInputUnreadable { .. } => "stage_input_unreadable",
            PipelineError::WriteFailure { .. } => "write_failure",
            PipelineError::Batch(_) => "batch",
            PipelineError::Session(_) => "session",
            PipelineError::StageAborted(_) => "stage_aborted",
        }
    }

    pub(crate) fn write_failure(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        PipelineError::WriteFailure {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        PipelineError::StageInputUnreadable {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
