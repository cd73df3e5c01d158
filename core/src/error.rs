use crate::types::{ActorId, StepIndex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisError {
    #[error("Sink '{target}' is not writable: {source}")]
    SinkUnwritable {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step sequence violated: {reason}")]
    Sequence { reason: String },

    #[error("Step {index} out of range: {len} steps allocated")]
    StepOutOfRange { index: StepIndex, len: StepIndex },

    #[error("Step {index} has already been streamed and cannot change")]
    StepSealed { index: StepIndex },

    #[error("Recorder is closed")]
    Closed,

    #[error("Step {index} is no longer held in memory")]
    NotAvailable { index: StepIndex },

    #[error("Actor {id} export failed: {reason}")]
    ActorExport { id: ActorId, reason: String },

    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error in {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VisError {
    pub(crate) fn sequence(reason: impl Into<String>) -> Self {
        Self::Sequence { reason: reason.into() }
    }

    /// Fatal errors end the run; the caller may not keep recording.
    /// Rejected input (a failing actor export, a non-finite coordinate)
    /// leaves the step untouched and the recorder usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::NotAvailable { .. } | Self::ActorExport { .. } | Self::InvalidSnapshot { .. }
        )
    }
}

pub type VisResult<T> = Result<T, VisError>;
