//! Observable state published by the update controller

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Progress of the current (or last) download session.
///
/// Within a session the value only moves forward:
/// `Idle -> Progress* -> Complete | Failed`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DownloadState {
    #[default]
    Idle,
    /// Transferred fraction in `[0.0, 1.0]`
    Progress(f64),
    /// Fully written artifact, ready for installation
    Complete(PathBuf),
    Failed(String),
}

impl DownloadState {
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::Progress(fraction) => Some(*fraction),
            Self::Complete(_) => Some(1.0),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failed(_))
    }
}

/// Coarse phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    #[default]
    Idle,
    Checking,
    UpToDate,
    UpdateAvailable,
    Downloading,
    DownloadComplete,
    Installing,
    Failed,
}

impl UpdateStatus {
    /// Phases during which a network operation owns the controller.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Checking | Self::Downloading)
    }

    pub fn can_transition_to(self, next: UpdateStatus) -> bool {
        use UpdateStatus::*;

        match (self, next) {
            (Checking, UpToDate | UpdateAvailable | Failed) => true,
            (Downloading, DownloadComplete | Failed | Idle) => true,
            (Checking | Downloading, _) => false,
            (Idle | UpToDate | UpdateAvailable | DownloadComplete | Failed, Checking) => true,
            (Idle | UpdateAvailable | DownloadComplete, Downloading) => true,
            (DownloadComplete, Installing) => true,
            (Installing, Failed) => true,
            (_, Idle) => true,
            _ => false,
        }
    }
}

/// Outcome of one `check_for_updates` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum UpdateCheckResult {
    UpdateAvailable {
        current_version: String,
        latest_version: String,
        notes: String,
        /// `None` when the release carries no installable asset
        download_url: Option<String>,
    },
    UpToDate {
        current_version: String,
        latest_version: String,
    },
    CheckFailed {
        reason: String,
    },
}

impl UpdateCheckResult {
    pub fn download_url(&self) -> Option<&str> {
        match self {
            Self::UpdateAvailable { download_url, .. } => download_url.as_deref(),
            _ => None,
        }
    }
}
