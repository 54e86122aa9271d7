//! selfupdate - check, download and install new builds of the running
//! application from a GitHub release feed.
//!
//! [`UpdateController`] ties the pieces together: it asks a
//! [`ReleaseClient`] for the latest release, compares versions, selects the
//! asset for the running platform, streams it to disk with observable
//! progress and cancellation, and hands the finished artifact to an
//! [`InstallTrigger`].

pub use selfupdate_core as core;
pub use selfupdate_provider as provider;
pub use selfupdate_utils as utils;

// Re-export commonly used types for convenience
pub use selfupdate_core::{
    select_asset, AssetRules, CommandInstallTrigger, DownloadState, HostPlatform, InstallTrigger,
    PlatformTagProvider, StaticPlatformTag, UpdateCheckResult, UpdateController, UpdateError,
    UpdateStatus, UpdaterConfig,
};
pub use selfupdate_provider::{
    DownloadError, GitHubReleaseClient, ReleaseAsset, ReleaseClient, ReleaseInfo,
};
pub use selfupdate_utils::{compare, normalize_tag, Version, VersionOrdering};
