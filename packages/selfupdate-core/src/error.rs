//! Errors surfaced by the update controller

use selfupdate_provider::DownloadError;

use crate::state::UpdateStatus;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UpdateError {
    /// A check or download is already running on this controller
    #[error("another update operation is in progress ({0:?})")]
    Busy(UpdateStatus),

    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: UpdateStatus, to: UpdateStatus },

    /// `install_update` was called before a download completed
    #[error("Update file is missing")]
    NoArtifact,

    #[error("Download URL is missing")]
    MissingUrl,

    #[error("download was cancelled")]
    Cancelled,

    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("install failed: {0}")]
    Install(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl UpdateError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;
