//! The seam between the update controller and the network.

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::data::ReleaseInfo;
use crate::error::Result;

/// Progress callback receiving the transferred fraction in `[0.0, 1.0]`.
pub type ProgressCallback = dyn Fn(f64) + Send + Sync;

#[async_trait]
pub trait ReleaseClient: Send + Sync {
    /// Latest published release, or `None` when the feed is unavailable for
    /// any reason (transport, status, malformed document).
    async fn fetch_latest_release(&self) -> Option<ReleaseInfo>;

    /// Stream `url` into `dest` and return the number of bytes written.
    ///
    /// `dest` is only created once the server has answered with a success
    /// status. `cancel` is polled before every chunk write; a cancelled
    /// transfer returns an error whose kind is `Cancelled`. Removing a partial
    /// `dest` is left to the caller.
    async fn stream_download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<u64>;
}
