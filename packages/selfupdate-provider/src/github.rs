use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use selfupdate_utils::HttpClient;

use crate::client::{ProgressCallback, ReleaseClient};
use crate::data::ReleaseInfo;
use crate::download::{stream_to_file, DEFAULT_CHUNK_SIZE};
use crate::error::Result;

pub const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Release client backed by the GitHub REST API
/// (`/repos/{owner}/{repo}/releases/latest`).
#[derive(Debug, Clone)]
pub struct GitHubReleaseClient {
    http: HttpClient,
    api_url: String,
    owner: String,
    repo: String,
    token: Option<String>,
    chunk_size: usize,
}

impl GitHubReleaseClient {
    pub fn new(http: HttpClient, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            http,
            api_url: GITHUB_API_URL.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Point at a GitHub Enterprise host, a mirror or a test server.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Blank tokens are ignored.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = Some(token).filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_url, self.owner, self.repo
        )
    }

    fn api_header_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::from([("Accept".to_string(), GITHUB_JSON_MEDIA_TYPE.to_string())]);
        if let Some(token) = &self.token {
            map.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        map
    }
}

#[async_trait]
impl ReleaseClient for GitHubReleaseClient {
    async fn fetch_latest_release(&self) -> Option<ReleaseInfo> {
        let url = self.latest_release_url();
        let rsp = match self.http.get(&url, &self.api_header_map()).await {
            Ok(rsp) => rsp,
            Err(e) => {
                tracing::warn!("release feed request to {} failed: {}", url, e);
                return None;
            }
        };
        if !rsp.is_success() {
            tracing::warn!("release feed {} answered HTTP {}", url, rsp.status);
            return None;
        }
        let body = rsp.body?;
        match serde_json::from_slice::<ReleaseInfo>(&body) {
            Ok(release) => {
                tracing::debug!(
                    "latest release {} with {} assets",
                    release.tag_name,
                    release.assets.len()
                );
                Some(release)
            }
            Err(e) => {
                tracing::warn!("release feed {} returned malformed JSON: {}", url, e);
                None
            }
        }
    }

    async fn stream_download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        stream_to_file(
            &self.http,
            url,
            dest,
            self.chunk_size,
            &HashMap::new(),
            on_progress,
            cancel,
        )
        .await
    }
}
