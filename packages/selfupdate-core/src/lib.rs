pub mod config;
pub mod controller;
pub mod error;
pub mod install;
pub mod platform;
pub mod selector;
pub mod state;

pub use config::UpdaterConfig;
pub use controller::UpdateController;
pub use error::UpdateError;
pub use install::{CommandInstallTrigger, InstallTrigger};
pub use platform::{HostPlatform, PlatformTagProvider, StaticPlatformTag, FALLBACK_PLATFORM_TAG};
pub use selector::{select_asset, AssetRules};
pub use state::{DownloadState, UpdateCheckResult, UpdateStatus};
