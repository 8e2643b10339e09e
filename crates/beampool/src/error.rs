use std::path::PathBuf;

/// Errors produced while preparing or running a decode pool.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Ensembled models disagree on the shape of their output space.
    #[error("model {model} has {field} = {found}, but the ensemble expects {expected}")]
    ConfigurationMismatch {
        model: String,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// The constraint file could not be read. Callers log this and decode unconstrained.
    #[error("unable to read constraint file {path}: {source}")]
    ConstraintFileMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("factored scoring needs at least {required} reference files, got {found}")]
    ReferenceCountMismatch { required: usize, found: usize },

    /// A worker failed while decoding. Fatal for the whole run.
    #[error("worker decode failure: {0}")]
    WorkerDecodeFailure(String),

    /// The beam search collaborator reported an error or returned malformed output.
    #[error("beam search error: {0}")]
    Search(String),

    #[error("no model type registered under {0:?}")]
    UnknownModelType(String),

    #[error("no metric registered under {0:?}")]
    UnknownMetric(String),

    #[error("response for request {0} arrived more than once")]
    DuplicateResponse(usize),

    #[error("response index {index} is outside the result table of {len} entries")]
    UnexpectedIndex { index: usize, len: usize },

    #[error("sample source ended after {found} of {expected} sentences")]
    SourceExhausted { expected: usize, found: usize },

    #[error("no response was recorded for request {0}")]
    MissingResponse(usize),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, DecodeError>;
