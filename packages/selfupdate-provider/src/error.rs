//! Error types for release transfers

use selfupdate_utils::HttpError;

/// Error type for download operations
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct DownloadError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of download errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection failed, timed out or broke off mid-transfer
    Network,
    /// Server answered with a non-success status; nothing was written
    HttpStatus,
    /// Destination could not be created or written
    FileSystem,
    /// Bad URL or parameters
    InvalidInput,
    /// Caller asked the transfer to stop
    Cancelled,
}

impl DownloadError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn http_status(status: u16, url: &str) -> Self {
        Self::new(ErrorKind::HttpStatus, format!("HTTP {} for {}", status, url))
    }

    pub fn file_system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileSystem, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::file_system(err.to_string())
    }
}

impl From<HttpError> for DownloadError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::InvalidUri { .. } => Self::invalid_input(err.to_string()),
            other => Self::network(other.to_string()),
        }
    }
}

/// Result type for download operations
pub type Result<T> = std::result::Result<T, DownloadError>;
