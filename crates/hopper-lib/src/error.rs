use std::path::PathBuf;
use thiserror::Error;

/// Broad failure classes surfaced to callers of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    NotFound,
    Filesystem,
    Internal,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {what}: {message}")]
    Malformed { what: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn network(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: err.to_string(),
        }
    }

    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            what: what.into(),
            message: err.to_string(),
        }
    }

    /// Malformed metadata is reported as a NotFound-class failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::HttpStatus { .. } => ErrorKind::Network,
            Self::NotFound(_) | Self::Malformed { .. } => ErrorKind::NotFound,
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }
}
