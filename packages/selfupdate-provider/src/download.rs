//! Chunked, cancellable transfer of a single asset to disk.

use std::collections::HashMap;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use selfupdate_utils::{content_length, HttpClient};

use crate::client::ProgressCallback;
use crate::error::{DownloadError, Result};

/// Bytes written per step; also the granularity of progress reports and
/// cancellation checks.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Best-effort HEAD probe for the asset size. Any failure means "unknown".
pub async fn probe_content_length(
    http: &HttpClient,
    url: &str,
    header_map: &HashMap<String, String>,
) -> Option<u64> {
    match http.head(url, header_map).await {
        Ok(rsp) if rsp.is_success() => rsp.content_length.filter(|len| *len > 0),
        Ok(rsp) => {
            tracing::debug!("size probe for {} answered {}", url, rsp.status);
            None
        }
        Err(e) => {
            tracing::debug!("size probe for {} failed: {}", url, e);
            None
        }
    }
}

/// Download `url` into `dest`, reporting progress after every chunk when the
/// total size is known, or a single `1.0` at the end when it is not.
pub async fn stream_to_file(
    http: &HttpClient,
    url: &str,
    dest: &Path,
    chunk_size: usize,
    header_map: &HashMap<String, String>,
    on_progress: &ProgressCallback,
    cancel: &CancellationToken,
) -> Result<u64> {
    if url.trim().is_empty() {
        return Err(DownloadError::invalid_input("URL cannot be empty"));
    }
    if chunk_size == 0 {
        return Err(DownloadError::invalid_input("chunk size must be positive"));
    }

    let probed = probe_content_length(http, url, header_map).await;
    if cancel.is_cancelled() {
        return Err(DownloadError::cancelled("cancelled before transfer"));
    }

    let mut res = http.get_stream(url, header_map).await?;
    let status = res.status();
    if !status.is_success() {
        return Err(DownloadError::http_status(status.as_u16(), url));
    }
    let total = probed.or_else(|| content_length(&res).filter(|len| *len > 0));
    tracing::debug!("downloading {} ({:?} bytes)", url, total);

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            DownloadError::file_system(format!("Failed to create directory: {}", e))
        })?;
    }
    let mut file = File::create(dest)
        .await
        .map_err(|e| DownloadError::file_system(format!("Failed to create file: {}", e)))?;

    let mut written: u64 = 0;
    loop {
        let frame = match http.next_chunk(res.body_mut()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                return Err(DownloadError::network(format!(
                    "transfer interrupted after {} bytes: {}",
                    written, e
                )))
            }
        };
        for chunk in frame.chunks(chunk_size) {
            if cancel.is_cancelled() {
                return Err(DownloadError::cancelled(format!(
                    "cancelled after {} bytes",
                    written
                )));
            }
            file.write_all(chunk)
                .await
                .map_err(|e| DownloadError::file_system(format!("Failed to write chunk: {}", e)))?;
            written += chunk.len() as u64;
            if let Some(total) = total {
                on_progress((written as f64 / total as f64).min(1.0));
            }
        }
    }
    if cancel.is_cancelled() {
        return Err(DownloadError::cancelled(format!(
            "cancelled after {} bytes",
            written
        )));
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::file_system(format!("Failed to flush file: {}", e)))?;
    file.sync_all()
        .await
        .map_err(|e| DownloadError::file_system(format!("Failed to sync file: {}", e)))?;

    if total.is_none() {
        on_progress(1.0);
    }
    Ok(written)
}
