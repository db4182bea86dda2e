use serde::{Deserialize, Serialize};

/// Opaque server-assigned album identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlbumId(pub String);

impl AlbumId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AlbumId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AlbumId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An album as returned by `GET /v1/albums`. Untitled albums exist and come
/// back without a `title`.
#[derive(Debug, Clone, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    #[serde(default)]
    pub title: String,
}

/// One page of `GET /v1/albums`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumListResponse {
    #[serde(default)]
    pub albums: Option<Vec<Album>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Response from `POST /v1/mediaItems:batchCreate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResponse {
    #[serde(default)]
    pub new_media_item_results: Option<Vec<NewMediaItemResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItemResult {
    #[serde(default)]
    pub status: Option<ItemStatus>,
    #[serde(default)]
    pub media_item: Option<MediaItem>,
}

/// `google.rpc.Status` for a single item; a missing or zero code is success.
#[derive(Debug, Deserialize)]
pub struct ItemStatus {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub product_url: Option<String>,
}

/// Status and body of a raw-bytes upload.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// The upload token, present only for a 200 with a non-empty body.
    pub fn upload_token(&self) -> Option<String> {
        if self.status == 200 && !self.body.is_empty() {
            Some(String::from_utf8_lossy(&self.body).into_owned())
        } else {
            None
        }
    }
}

impl std::fmt::Display for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const MAX_BODY: usize = 512;
        let body = String::from_utf8_lossy(&self.body);
        if body.len() > MAX_BODY {
            let cut = (0..=MAX_BODY)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            write!(f, "HTTP {} {}...", self.status, &body[..cut])
        } else {
            write!(f, "HTTP {} {}", self.status, body)
        }
    }
}
