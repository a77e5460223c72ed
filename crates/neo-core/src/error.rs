use thiserror::Error;

/// Failure categories shared by every backend. Transports and stores map their
/// own errors into one of these before handing them to the retry logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NeoError {
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl NeoError {
    pub fn is_transient(&self) -> bool {
        matches!(self, NeoError::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, NeoError::NotFound(_))
    }
}

/// Outcome of a failed per-item upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("blob {blob} not found: {source}")]
    NotFound {
        blob: String,
        #[source]
        source: NeoError,
    },
    #[error("upload of {blob} failed after {attempts} attempts: {source}")]
    Exhausted {
        blob: String,
        attempts: u32,
        #[source]
        source: NeoError,
    },
    #[error("upload of {blob} rejected: {source}")]
    Rejected {
        blob: String,
        #[source]
        source: NeoError,
    },
}

impl UploadError {
    pub fn blob(&self) -> &str {
        match self {
            UploadError::NotFound { blob, .. }
            | UploadError::Exhausted { blob, .. }
            | UploadError::Rejected { blob, .. } => blob,
        }
    }
}

/// Failures that end a run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("container {container} setup failed: {source}")]
    ContainerSetup {
        container: String,
        #[source]
        source: NeoError,
    },
    #[error("feed fetch failed: {0}")]
    Fetch(#[source] NeoError),
}
