pub mod client;
pub mod data;
pub mod download;
pub mod error;
pub mod github;

// Re-export common types
pub use client::{ProgressCallback, ReleaseClient};
pub use data::{ReleaseAsset, ReleaseInfo};
pub use download::DEFAULT_CHUNK_SIZE;
pub use error::{DownloadError, ErrorKind};
pub use github::{GitHubReleaseClient, GITHUB_API_URL};
