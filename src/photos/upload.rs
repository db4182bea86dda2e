use std::path::Path;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::error::PhotosError;
use super::types::BatchCreateResponse;
use super::PhotosLibrary;

const UPLOAD_PROTOCOL: HeaderName = HeaderName::from_static("x-goog-upload-protocol");
const UPLOAD_FILE_NAME: HeaderName = HeaderName::from_static("x-goog-upload-file-name");

/// Result of one `upload_photos` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// An album was requested but could not be found or created; nothing
    /// was uploaded.
    AlbumUnavailable,
    /// Every file was attempted. `failed` counts files that were skipped or
    /// rejected at any stage.
    Completed { added: usize, failed: usize },
}

impl PhotosLibrary {
    /// Upload each file and register it in the library, optionally adding it
    /// to the album titled `album_title`.
    ///
    /// Per-file failures are logged and the batch moves on. Only transport,
    /// decoding and authorization failures are returned as errors.
    pub async fn upload_photos<P: AsRef<Path>>(
        &self,
        paths: &[P],
        album_title: Option<&str>,
    ) -> Result<UploadOutcome, PhotosError> {
        let album_title = album_title.filter(|t| !t.is_empty());
        let album_id = match album_title {
            Some(title) => match self.ensure_album(title).await? {
                Some(id) => Some(id),
                None => return Ok(UploadOutcome::AlbumUnavailable),
            },
            None => None,
        };

        let mut batch_headers = HeaderMap::new();
        batch_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        batch_headers.insert(UPLOAD_PROTOCOL, HeaderValue::from_static("raw"));

        let upload_url = self.endpoints.uploads();
        let batch_create_url = self.endpoints.batch_create();
        let mut added = 0;
        let mut failed = 0;

        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let bytes = match tokio::fs::read(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("Could not read file '{}' -- {}", path.display(), e);
                    failed += 1;
                    continue;
                }
            };

            let mut headers = batch_headers.clone();
            match HeaderValue::from_bytes(name.as_bytes()) {
                Ok(value) => {
                    headers.insert(UPLOAD_FILE_NAME, value);
                }
                Err(e) => {
                    error!("Could not upload '{}' -- invalid file name: {}", name, e);
                    failed += 1;
                    continue;
                }
            }

            info!("Uploading photo -- '{}'", path.display());
            let response = self.session.post_bytes(&upload_url, bytes, headers).await?;
            let Some(upload_token) = response.upload_token() else {
                error!("Could not upload '{}'. Server response - {}", name, response);
                failed += 1;
                continue;
            };

            let body = json!({
                "albumId": album_id.as_ref().map(|id| id.as_str()),
                "newMediaItems": [{
                    "description": "",
                    "simpleMediaItem": {"uploadToken": upload_token}
                }]
            });
            let response = self.session.post_json(&batch_create_url, &body).await?;
            debug!("Server response: {}", response);

            if report_batch_create(&name, album_title, &response) {
                added += 1;
            } else {
                failed += 1;
            }
        }

        info!(added, failed, "Upload batch finished");
        Ok(UploadOutcome::Completed { added, failed })
    }
}

/// Log the outcome of a `batchCreate` call and report whether the item made
/// it into the library.
fn report_batch_create(name: &str, album_title: Option<&str>, response: &Value) -> bool {
    let results = serde_json::from_value::<BatchCreateResponse>(response.clone())
        .ok()
        .and_then(|r| r.new_media_item_results)
        .filter(|r| !r.is_empty());
    let Some(results) = results else {
        error!(
            "Could not add '{}' to library. Server response -- {}",
            name, response
        );
        return false;
    };

    let status = results[0].status.as_ref();
    if let Some(code) = status.and_then(|s| s.code).filter(|&c| c > 0) {
        let message = status
            .and_then(|s| s.message.as_deref())
            .unwrap_or_default();
        error!("Could not add '{}' to library -- {} (code {})", name, message, code);
        return false;
    }

    if let Some(item) = &results[0].media_item {
        debug!(id = %item.id, url = ?item.product_url, "Created media item");
    }
    match album_title {
        Some(title) => info!("Added '{}' to library and album '{}'", name, title),
        None => info!("Added '{}' to library", name),
    }
    true
}
