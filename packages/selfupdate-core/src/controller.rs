//! Orchestrates check, download and install as one observable state machine.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use selfupdate_provider::{DownloadError, ReleaseClient, ReleaseInfo};
use selfupdate_utils::versioning::{compare, normalize_tag, VersionOrdering};

use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::install::InstallTrigger;
use crate::platform::{resolve_platform_tag, HostPlatform, PlatformTagProvider, StaticPlatformTag};
use crate::selector::AssetRules;
use crate::state::{DownloadState, UpdateCheckResult, UpdateStatus};

/// Self-update controller.
///
/// Cloning is cheap and every clone drives the same state, so a clone can be
/// moved into a task to call [`UpdateController::cancel_download`] while
/// another awaits [`UpdateController::download_update`].
#[derive(Clone)]
pub struct UpdateController {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn ReleaseClient>,
    platform: Arc<dyn PlatformTagProvider>,
    installer: Arc<dyn InstallTrigger>,
    current_version: String,
    artifact_path: PathBuf,
    asset_rules: AssetRules,
    status: watch::Sender<UpdateStatus>,
    download: watch::Sender<DownloadState>,
    session: Mutex<Session>,
}

#[derive(Default)]
struct Session {
    cancel: Option<CancellationToken>,
    artifact: Option<PathBuf>,
    release: Option<ReleaseInfo>,
    last_check: Option<UpdateCheckResult>,
}

impl UpdateController {
    pub fn new(
        client: Arc<dyn ReleaseClient>,
        config: &UpdaterConfig,
        platform: Arc<dyn PlatformTagProvider>,
        installer: Arc<dyn InstallTrigger>,
    ) -> Self {
        let platform: Arc<dyn PlatformTagProvider> = match &config.platform_tag {
            Some(tag) => Arc::new(StaticPlatformTag::new(tag.clone())),
            None => platform,
        };
        let (status, _) = watch::channel(UpdateStatus::Idle);
        let (download, _) = watch::channel(DownloadState::Idle);

        Self {
            inner: Arc::new(Inner {
                client,
                platform,
                installer,
                current_version: config.current_version.clone(),
                artifact_path: config.artifact_path(),
                asset_rules: config.asset_rules.clone(),
                status,
                download,
                session: Mutex::new(Session::default()),
            }),
        }
    }

    /// GitHub-backed controller for the host platform.
    pub fn from_config(config: &UpdaterConfig, installer: Arc<dyn InstallTrigger>) -> Result<Self> {
        let client = config.release_client()?;
        Ok(Self::new(
            Arc::new(client),
            config,
            Arc::new(HostPlatform),
            installer,
        ))
    }

    pub fn status(&self) -> UpdateStatus {
        *self.inner.status.borrow()
    }

    pub fn download_state(&self) -> DownloadState {
        self.inner.download.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<UpdateStatus> {
        self.inner.status.subscribe()
    }

    pub fn subscribe_download(&self) -> watch::Receiver<DownloadState> {
        self.inner.download.subscribe()
    }

    pub fn current_version(&self) -> &str {
        &self.inner.current_version
    }

    /// Release retained from the last successful check.
    pub fn latest_release(&self) -> Option<ReleaseInfo> {
        self.inner.session.lock().release.clone()
    }

    pub fn last_check(&self) -> Option<UpdateCheckResult> {
        self.inner.session.lock().last_check.clone()
    }

    /// Location of the completed artifact, if a download has finished.
    pub fn artifact(&self) -> Option<PathBuf> {
        self.inner.session.lock().artifact.clone()
    }

    /// Fetch the latest release and decide whether it is newer than the
    /// running build. Feed failures are reported as
    /// [`UpdateCheckResult::CheckFailed`], not as an error.
    ///
    /// A new check forgets the previously downloaded artifact, so
    /// [`install_update`](Self::install_update) afterwards reports
    /// [`UpdateError::NoArtifact`] until the next download completes. If the
    /// returned future is dropped before the feed answers, the check ends as
    /// `CheckFailed` and the controller moves to `Failed`.
    pub async fn check_for_updates(&self) -> Result<UpdateCheckResult> {
        {
            let mut session = self.inner.session.lock();
            self.inner.transition(UpdateStatus::Checking)?;
            session.artifact = None;
        }
        let mut guard = CheckGuard {
            inner: &self.inner,
            finished: false,
        };

        let Some(release) = self.inner.client.fetch_latest_release().await else {
            guard.finished = true;
            return Ok(self.inner.fail_check("Failed to fetch latest release"));
        };
        guard.finished = true;

        let current_version = self.inner.current_version.clone();
        let latest_version = release.version().to_string();
        let ordering = compare(&latest_version, normalize_tag(&current_version));
        tracing::info!(
            "latest release {} vs running {}: {:?}",
            latest_version,
            current_version,
            ordering
        );

        let (result, next) = if ordering == VersionOrdering::Newer {
            let platform_tag = resolve_platform_tag(self.inner.platform.as_ref());
            let download_url = self
                .inner
                .asset_rules
                .select(&release.assets, &platform_tag)
                .map(|asset| asset.download_url.clone());
            let result = UpdateCheckResult::UpdateAvailable {
                current_version,
                latest_version,
                notes: release.notes().to_string(),
                download_url,
            };
            (result, UpdateStatus::UpdateAvailable)
        } else {
            let result = UpdateCheckResult::UpToDate {
                current_version,
                latest_version,
            };
            (result, UpdateStatus::UpToDate)
        };

        {
            let mut session = self.inner.session.lock();
            session.release = Some(release);
            session.last_check = Some(result.clone());
        }
        self.inner.set_status(next);
        Ok(result)
    }

    /// Download `url` to the configured artifact location.
    ///
    /// Resolves once the session reached a terminal state: the artifact path
    /// on success, [`UpdateError::Cancelled`] when
    /// [`cancel_download`](Self::cancel_download) stopped it.
    pub async fn download_update(&self, url: &str) -> Result<PathBuf> {
        if url.trim().is_empty() {
            return Err(UpdateError::MissingUrl);
        }

        let cancel = CancellationToken::new();
        {
            // Holding the session lock across the phase change keeps
            // cancel_download from observing Downloading without a token.
            let mut session = self.inner.session.lock();
            self.inner.transition(UpdateStatus::Downloading)?;
            session.cancel = Some(cancel.clone());
            session.artifact = None;
        }
        self.inner.download.send_replace(DownloadState::Idle);
        self.inner.download.send_replace(DownloadState::Progress(0.0));

        let inner = self.inner.clone();
        let handle = tokio::spawn(inner.run_session(url.to_string(), cancel));
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = DownloadError::network(format!("download task aborted: {}", e));
                self.inner.session.lock().cancel = None;
                self.inner.download.send_replace(DownloadState::Failed(err.to_string()));
                self.inner.set_status(UpdateStatus::Failed);
                Err(err.into())
            }
        }
    }

    /// Ask the running download to stop. The transfer notices within one
    /// chunk, removes its partial file and returns the controller to `Idle`.
    pub fn cancel_download(&self) {
        let token = self.inner.session.lock().cancel.clone();
        match token {
            Some(token) => {
                tracing::info!("cancelling download");
                token.cancel();
            }
            None => tracing::debug!("cancel requested with no download in flight"),
        }
    }

    /// Hand the completed artifact to the install trigger.
    pub fn install_update(&self) -> Result<()> {
        let artifact = self
            .inner
            .session
            .lock()
            .artifact
            .clone()
            .filter(|path| path.is_file())
            .ok_or(UpdateError::NoArtifact)?;

        self.inner.transition(UpdateStatus::Installing)?;
        match self.inner.installer.install(&artifact) {
            Ok(()) => {
                tracing::info!("install triggered for {}", artifact.display());
                Ok(())
            }
            Err(e) => {
                tracing::warn!("install trigger failed: {}", e);
                self.inner.set_status(UpdateStatus::Failed);
                Err(e)
            }
        }
    }

    /// Dismiss the current outcome and return to `Idle`. The downloaded file
    /// stays on disk until the next download replaces it.
    pub fn reset(&self) -> Result<()> {
        let mut session = self.inner.session.lock();
        self.inner.transition(UpdateStatus::Idle)?;
        session.artifact = None;
        self.inner.download.send_replace(DownloadState::Idle);
        Ok(())
    }
}

impl Inner {
    /// Entry into a new phase requested by a caller. Work already running
    /// makes every request fail with [`UpdateError::Busy`].
    fn transition(&self, next: UpdateStatus) -> Result<()> {
        let mut outcome = Ok(());
        self.status.send_if_modified(|current| {
            if current.is_busy() {
                outcome = Err(UpdateError::Busy(*current));
                false
            } else if current.can_transition_to(next) {
                let changed = *current != next;
                *current = next;
                changed
            } else {
                outcome = Err(UpdateError::InvalidTransition {
                    from: *current,
                    to: next,
                });
                false
            }
        });
        if outcome.is_ok() {
            tracing::info!("update status -> {:?}", next);
        }
        outcome
    }

    fn fail_check(&self, reason: &str) -> UpdateCheckResult {
        let result = UpdateCheckResult::CheckFailed {
            reason: reason.to_string(),
        };
        {
            let mut session = self.session.lock();
            session.release = None;
            session.last_check = Some(result.clone());
        }
        self.set_status(UpdateStatus::Failed);
        result
    }

    /// Phase change decided by the operation that owns the current phase.
    fn set_status(&self, next: UpdateStatus) {
        let previous = self.status.send_replace(next);
        if !previous.can_transition_to(next) {
            tracing::warn!("unexpected status change {:?} -> {:?}", previous, next);
        }
        tracing::info!("update status -> {:?}", next);
    }

    /// Republish transfer progress, keeping it non-decreasing.
    fn publish_progress(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.download.send_if_modified(|state| match state {
            DownloadState::Progress(previous) if fraction > *previous => {
                *state = DownloadState::Progress(fraction);
                true
            }
            _ => false,
        });
    }

    async fn run_session(
        self: Arc<Self>,
        url: String,
        cancel: CancellationToken,
    ) -> Result<PathBuf> {
        let artifact = self.artifact_path.clone();
        let partial = partial_path(&artifact);
        remove_if_exists(&artifact).await;
        remove_if_exists(&partial).await;

        tracing::info!("downloading {} to {}", url, artifact.display());
        let progress = self.clone();
        let on_progress = move |fraction: f64| progress.publish_progress(fraction);
        let mut outcome = self
            .client
            .stream_download(&url, &partial, &on_progress, &cancel)
            .await;

        if outcome.is_ok() && cancel.is_cancelled() {
            outcome = Err(DownloadError::cancelled("cancelled after transfer"));
        }
        if let Ok(bytes) = outcome {
            outcome = tokio::fs::rename(&partial, &artifact)
                .await
                .map(|_| bytes)
                .map_err(|e| {
                    DownloadError::file_system(format!("Failed to rename downloaded file: {}", e))
                });
        }

        self.session.lock().cancel = None;
        match outcome {
            Ok(bytes) => {
                self.publish_progress(1.0);
                self.session.lock().artifact = Some(artifact.clone());
                self.download.send_replace(DownloadState::Complete(artifact.clone()));
                self.set_status(UpdateStatus::DownloadComplete);
                tracing::info!("downloaded {} bytes to {}", bytes, artifact.display());
                Ok(artifact)
            }
            Err(e) if e.is_cancelled() => {
                remove_if_exists(&partial).await;
                self.download.send_replace(DownloadState::Idle);
                self.set_status(UpdateStatus::Idle);
                tracing::info!("download cancelled: {}", e.message);
                Err(UpdateError::Cancelled)
            }
            Err(e) => {
                remove_if_exists(&partial).await;
                tracing::warn!("download of {} failed: {}", url, e);
                self.download.send_replace(DownloadState::Failed(e.to_string()));
                self.set_status(UpdateStatus::Failed);
                Err(e.into())
            }
        }
    }
}

/// Ends a check whose future was dropped while waiting on the feed.
struct CheckGuard<'a> {
    inner: &'a Inner,
    finished: bool,
}

impl Drop for CheckGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!("update check dropped before the feed answered");
            self.inner.fail_check("Update check was interrupted");
        }
    }
}

fn partial_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    artifact.with_file_name(name)
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use selfupdate_provider::{ProgressCallback, ReleaseAsset};
    use std::time::Duration;

    const PAYLOAD_LEN: usize = 4 * 1024;

    #[derive(Clone, Copy, PartialEq)]
    enum Transfer {
        Succeed,
        Fail,
        /// Write one chunk, then wait for cancellation
        Stall,
        /// Write part of the payload, then lose the connection
        Interrupt,
    }

    struct MockClient {
        release: Mutex<Option<ReleaseInfo>>,
        transfer: Transfer,
        feed_delay: Option<Duration>,
    }

    #[async_trait]
    impl ReleaseClient for MockClient {
        async fn fetch_latest_release(&self) -> Option<ReleaseInfo> {
            if let Some(delay) = self.feed_delay {
                tokio::time::sleep(delay).await;
            }
            self.release.lock().clone()
        }

        async fn stream_download(
            &self,
            _url: &str,
            dest: &Path,
            on_progress: &ProgressCallback,
            cancel: &CancellationToken,
        ) -> selfupdate_provider::error::Result<u64> {
            match self.transfer {
                Transfer::Fail => Err(DownloadError::http_status(
                    404,
                    "https://example.com/a.apk",
                )),
                Transfer::Succeed => {
                    tokio::fs::create_dir_all(dest.parent().unwrap()).await?;
                    tokio::fs::write(dest, vec![1u8; PAYLOAD_LEN]).await?;
                    on_progress(0.5);
                    on_progress(0.25);
                    on_progress(1.0);
                    Ok(PAYLOAD_LEN as u64)
                }
                Transfer::Interrupt => {
                    tokio::fs::create_dir_all(dest.parent().unwrap()).await?;
                    tokio::fs::write(dest, vec![1u8; PAYLOAD_LEN / 2]).await?;
                    on_progress(0.4);
                    Err(DownloadError::network(
                        "transfer interrupted after 2048 bytes: connection reset",
                    ))
                }
                Transfer::Stall => {
                    tokio::fs::create_dir_all(dest.parent().unwrap()).await?;
                    tokio::fs::write(dest, vec![1u8; PAYLOAD_LEN / 4]).await?;
                    on_progress(0.25);
                    tokio::select! {
                        _ = cancel.cancelled() => Err(DownloadError::cancelled("stop")),
                        _ = tokio::time::sleep(Duration::from_secs(10)) => {
                            Err(DownloadError::network("test stalled"))
                        }
                    }
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingInstaller {
        calls: Mutex<Vec<PathBuf>>,
    }

    impl InstallTrigger for RecordingInstaller {
        fn install(&self, artifact: &Path) -> Result<()> {
            self.calls.lock().push(artifact.to_path_buf());
            Ok(())
        }
    }

    fn release(tag: &str) -> ReleaseInfo {
        let asset = |id: u64, name: &str| ReleaseAsset {
            id,
            name: name.to_string(),
            size: PAYLOAD_LEN as u64,
            content_type: "application/vnd.android.package-archive".to_string(),
            download_url: format!("https://example.com/{}", name),
        };
        ReleaseInfo {
            id: 1,
            tag_name: tag.to_string(),
            name: None,
            body: Some("Bug fixes".to_string()),
            html_url: None,
            created_at: None,
            published_at: None,
            prerelease: false,
            assets: vec![
                asset(1, "app-debug-arm64-v8a-release.apk"),
                asset(2, "app-universal-release.apk"),
                asset(3, "app-arm64-v8a-release.apk"),
            ],
        }
    }

    struct Fixture {
        controller: UpdateController,
        client: Arc<MockClient>,
        installer: Arc<RecordingInstaller>,
        _dir: tempfile::TempDir,
    }

    fn fixture(current: &str, release: Option<ReleaseInfo>, transfer: Transfer) -> Fixture {
        build_fixture(current, release, transfer, None)
    }

    fn build_fixture(
        current: &str,
        release: Option<ReleaseInfo>,
        transfer: Transfer,
        feed_delay: Option<Duration>,
    ) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = UpdaterConfig::new("example", "app")
            .with_current_version(current)
            .with_artifact_dir(dir.path().join("updates"));
        let installer = Arc::new(RecordingInstaller::default());
        let client = Arc::new(MockClient {
            release: Mutex::new(release),
            transfer,
            feed_delay,
        });
        let controller = UpdateController::new(
            client.clone(),
            &config,
            Arc::new(StaticPlatformTag::new("arm64-v8a")),
            installer.clone(),
        );
        Fixture {
            controller,
            client,
            installer,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_check_reports_newer_release() {
        let f = fixture("1.9.0", Some(release("v2.0.0")), Transfer::Succeed);

        let result = f.controller.check_for_updates().await.unwrap();
        assert_eq!(
            result,
            UpdateCheckResult::UpdateAvailable {
                current_version: "1.9.0".to_string(),
                latest_version: "2.0.0".to_string(),
                notes: "Bug fixes".to_string(),
                download_url: Some("https://example.com/app-arm64-v8a-release.apk".to_string()),
            }
        );
        assert_eq!(f.controller.status(), UpdateStatus::UpdateAvailable);
        assert_eq!(f.controller.latest_release().unwrap().tag_name, "v2.0.0");
    }

    #[tokio::test]
    async fn test_check_same_version_is_up_to_date() {
        let f = fixture("2.0.0", Some(release("v2.0.0")), Transfer::Succeed);

        let result = f.controller.check_for_updates().await.unwrap();
        assert_eq!(
            result,
            UpdateCheckResult::UpToDate {
                current_version: "2.0.0".to_string(),
                latest_version: "2.0.0".to_string(),
            }
        );
        assert_eq!(f.controller.status(), UpdateStatus::UpToDate);
    }

    #[tokio::test]
    async fn test_check_without_assets_still_reports_update() {
        let mut bare = release("v3.0");
        bare.assets.clear();
        let f = fixture("2.9.9", Some(bare), Transfer::Succeed);

        let result = f.controller.check_for_updates().await.unwrap();
        assert!(matches!(
            result,
            UpdateCheckResult::UpdateAvailable { download_url: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_check_feed_unavailable() {
        let f = fixture("1.0.0", None, Transfer::Succeed);

        let result = f.controller.check_for_updates().await.unwrap();
        assert!(matches!(result, UpdateCheckResult::CheckFailed { .. }));
        assert_eq!(f.controller.status(), UpdateStatus::Failed);

        // retry from Failed is allowed
        assert!(f.controller.check_for_updates().await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_check_forgets_previous_release() {
        let f = fixture("1.9.0", Some(release("v2.0.0")), Transfer::Succeed);
        f.controller.check_for_updates().await.unwrap();
        assert!(f.controller.latest_release().is_some());

        *f.client.release.lock() = None;
        let result = f.controller.check_for_updates().await.unwrap();
        assert!(matches!(result, UpdateCheckResult::CheckFailed { .. }));
        assert_eq!(f.controller.last_check(), Some(result));
        assert!(f.controller.latest_release().is_none());
    }

    #[tokio::test]
    async fn test_dropped_check_does_not_stay_busy() {
        let f = build_fixture(
            "1.9.0",
            Some(release("v2.0.0")),
            Transfer::Succeed,
            Some(Duration::from_secs(30)),
        );

        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), f.controller.check_for_updates())
                .await;
        assert!(timed_out.is_err());

        assert_eq!(f.controller.status(), UpdateStatus::Failed);
        assert!(matches!(
            f.controller.last_check(),
            Some(UpdateCheckResult::CheckFailed { .. })
        ));
        assert!(f.controller.latest_release().is_none());

        f.controller.reset().unwrap();
        assert_eq!(f.controller.status(), UpdateStatus::Idle);
    }

    #[tokio::test]
    async fn test_check_after_download_forgets_artifact() {
        let f = fixture("1.9.0", Some(release("v2.0.0")), Transfer::Succeed);
        let result = f.controller.check_for_updates().await.unwrap();
        let url = result.download_url().unwrap().to_string();
        f.controller.download_update(&url).await.unwrap();
        assert!(f.controller.artifact().is_some());

        f.controller.check_for_updates().await.unwrap();
        assert_eq!(f.controller.status(), UpdateStatus::UpdateAvailable);
        assert!(f.controller.artifact().is_none());
        assert!(matches!(
            f.controller.install_update(),
            Err(UpdateError::NoArtifact)
        ));
        assert!(f.installer.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_download_then_install() {
        let f = fixture("1.9.0", Some(release("v2.0.0")), Transfer::Succeed);
        let result = f.controller.check_for_updates().await.unwrap();
        let url = result.download_url().unwrap().to_string();

        let artifact = f.controller.download_update(&url).await.unwrap();
        assert_eq!(std::fs::metadata(&artifact).unwrap().len(), PAYLOAD_LEN as u64);
        assert!(!partial_path(&artifact).exists());
        assert_eq!(f.controller.status(), UpdateStatus::DownloadComplete);
        assert_eq!(
            f.controller.download_state(),
            DownloadState::Complete(artifact.clone())
        );

        f.controller.install_update().unwrap();
        assert_eq!(*f.installer.calls.lock(), vec![artifact]);
        assert_eq!(f.controller.status(), UpdateStatus::Installing);

        // the trigger fires once per completed download
        assert!(matches!(
            f.controller.install_update(),
            Err(UpdateError::InvalidTransition { .. })
        ));
        assert_eq!(f.installer.calls.lock().len(), 1);

        f.controller.reset().unwrap();
        assert_eq!(f.controller.status(), UpdateStatus::Idle);
        assert_eq!(f.controller.download_state(), DownloadState::Idle);
    }

    #[tokio::test]
    async fn test_install_without_artifact() {
        let f = fixture("1.9.0", Some(release("v2.0.0")), Transfer::Succeed);
        assert!(matches!(
            f.controller.install_update(),
            Err(UpdateError::NoArtifact)
        ));
        assert!(f.installer.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_download_replaces_stale_artifact() {
        let f = fixture("1.9.0", None, Transfer::Succeed);
        let stale = f.controller.inner.artifact_path.clone();
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, b"old build").unwrap();

        let artifact = f
            .controller
            .download_update("https://example.com/a.apk")
            .await
            .unwrap();
        assert_eq!(artifact, stale);
        assert_eq!(std::fs::read(&artifact).unwrap(), vec![1u8; PAYLOAD_LEN]);
    }

    #[tokio::test]
    async fn test_download_failure() {
        let f = fixture("1.9.0", None, Transfer::Fail);

        let err = f
            .controller
            .download_update("https://example.com/a.apk")
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Download(_)));
        assert_eq!(f.controller.status(), UpdateStatus::Failed);
        assert!(matches!(
            f.controller.download_state(),
            DownloadState::Failed(_)
        ));
        assert!(!f.controller.inner.artifact_path.exists());

        // Failed only allows a new check or a reset
        assert!(matches!(
            f.controller.download_update("https://example.com/a.apk").await,
            Err(UpdateError::InvalidTransition { .. })
        ));
        f.controller.reset().unwrap();
        assert_eq!(f.controller.download_state(), DownloadState::Idle);
    }

    #[tokio::test]
    async fn test_download_interrupted_mid_transfer() {
        let f = fixture("1.9.0", None, Transfer::Interrupt);
        let mut progress = f.controller.subscribe_download();

        let err = f
            .controller
            .download_update("https://example.com/a.apk")
            .await
            .unwrap_err();
        match err {
            UpdateError::Download(e) => {
                assert_eq!(e.kind, selfupdate_provider::ErrorKind::Network);
                assert!(!e.is_cancelled());
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert_eq!(f.controller.status(), UpdateStatus::Failed);
        assert!(matches!(
            *progress.borrow_and_update(),
            DownloadState::Failed(_)
        ));
        let artifact = f.controller.inner.artifact_path.clone();
        assert!(!artifact.exists());
        assert!(!partial_path(&artifact).exists());
        assert!(f.controller.artifact().is_none());
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let f = fixture("1.9.0", None, Transfer::Succeed);
        assert!(matches!(
            f.controller.download_update("  ").await,
            Err(UpdateError::MissingUrl)
        ));
        assert_eq!(f.controller.status(), UpdateStatus::Idle);
    }

    #[tokio::test]
    async fn test_cancel_mid_download() {
        let f = fixture("1.9.0", None, Transfer::Stall);
        let controller = f.controller.clone();
        let task = tokio::spawn(async move {
            controller
                .download_update("https://example.com/a.apk")
                .await
        });

        let mut progress = f.controller.subscribe_download();
        progress
            .wait_for(|state| matches!(state, DownloadState::Progress(p) if *p > 0.0))
            .await
            .unwrap();

        // one operation at a time
        assert!(matches!(
            f.controller.download_update("https://example.com/b.apk").await,
            Err(UpdateError::Busy(UpdateStatus::Downloading))
        ));
        assert!(matches!(
            f.controller.check_for_updates().await,
            Err(UpdateError::Busy(_))
        ));
        assert!(matches!(f.controller.reset(), Err(UpdateError::Busy(_))));

        f.controller.cancel_download();
        let outcome = task.await.unwrap();
        assert!(matches!(outcome, Err(UpdateError::Cancelled)));

        let artifact = f.controller.inner.artifact_path.clone();
        assert!(!artifact.exists());
        assert!(!partial_path(&artifact).exists());
        assert_eq!(f.controller.status(), UpdateStatus::Idle);
        assert_eq!(f.controller.download_state(), DownloadState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_without_download_is_noop() {
        let f = fixture("1.9.0", None, Transfer::Succeed);
        f.controller.cancel_download();
        assert_eq!(f.controller.status(), UpdateStatus::Idle);
    }

    #[test]
    fn test_progress_never_decreases() {
        let f = fixture("1.9.0", None, Transfer::Succeed);
        let inner = &f.controller.inner;
        inner.download.send_replace(DownloadState::Progress(0.0));

        inner.publish_progress(0.5);
        inner.publish_progress(0.25);
        assert_eq!(*inner.download.borrow(), DownloadState::Progress(0.5));

        inner.publish_progress(3.0);
        assert_eq!(*inner.download.borrow(), DownloadState::Progress(1.0));

        // ignored outside a session
        inner.download.send_replace(DownloadState::Idle);
        inner.publish_progress(0.7);
        assert_eq!(*inner.download.borrow(), DownloadState::Idle);
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/updates/update.apk")),
            PathBuf::from("/tmp/updates/update.apk.part")
        );
    }
}
