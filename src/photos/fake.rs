//! In-memory Photos Library used by unit tests. It keeps server-side state
//! (albums, media items), paginates listings and records every request.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{json, Value};

use super::error::PhotosError;
use super::session::PhotosSession;
use super::types::RawResponse;

#[derive(Debug, Clone)]
pub enum Request {
    Get {
        url: String,
        query: Vec<(String, String)>,
    },
    PostJson {
        url: String,
        body: Value,
    },
    PostBytes {
        url: String,
        body: Vec<u8>,
        headers: HeaderMap,
    },
}

impl Request {
    pub fn url(&self) -> &str {
        match self {
            Request::Get { url, .. } | Request::PostJson { url, .. } | Request::PostBytes { url, .. } => {
                url
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeAlbum {
    pub id: String,
    pub title: String,
    pub app_created: bool,
}

#[derive(Debug, Clone)]
pub struct FakeMediaItem {
    pub upload_token: String,
    pub album_id: Option<String>,
}

#[derive(Default)]
struct FakeState {
    albums: Vec<FakeAlbum>,
    media_items: Vec<FakeMediaItem>,
    requests: Vec<Request>,
    uploads: usize,
}

pub struct FakeSession {
    state: Mutex<FakeState>,
    page_size: usize,
    reject_album_creation: bool,
    upload_status: u16,
    batch_override: Option<Value>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            state: Mutex::default(),
            page_size: 50,
            reject_album_creation: false,
            upload_status: 200,
            batch_override: None,
        }
    }

    pub fn with_album(self, id: &str, title: &str, app_created: bool) -> Self {
        self.state.lock().unwrap().albums.push(FakeAlbum {
            id: id.to_string(),
            title: title.to_string(),
            app_created,
        });
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn rejecting_album_creation(mut self) -> Self {
        self.reject_album_creation = true;
        self
    }

    pub fn upload_status(mut self, status: u16) -> Self {
        self.upload_status = status;
        self
    }

    pub fn batch_response(mut self, response: Value) -> Self {
        self.batch_override = Some(response);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, url_suffix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url().ends_with(url_suffix))
            .count()
    }

    pub fn albums(&self) -> Vec<FakeAlbum> {
        self.state.lock().unwrap().albums.clone()
    }

    pub fn media_items(&self) -> Vec<FakeMediaItem> {
        self.state.lock().unwrap().media_items.clone()
    }

    fn list_albums(&self, state: &FakeState, query: &[(&str, String)]) -> Value {
        let app_only = query
            .iter()
            .any(|(k, v)| *k == "excludeNonAppCreatedData" && v == "true");
        let offset: usize = query
            .iter()
            .find(|(k, _)| *k == "pageToken")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(0);

        let visible: Vec<&FakeAlbum> = state
            .albums
            .iter()
            .filter(|a| !app_only || a.app_created)
            .collect();
        let page: Vec<Value> = visible
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|a| json!({"id": a.id, "title": a.title}))
            .collect();

        // The real service omits `albums` entirely when a page is empty.
        if page.is_empty() {
            return json!({});
        }
        let next = offset + page.len();
        if next < visible.len() {
            json!({"albums": page, "nextPageToken": next.to_string()})
        } else {
            json!({"albums": page})
        }
    }

    fn create_album(&self, state: &mut FakeState, body: &Value) -> Value {
        if self.reject_album_creation {
            return json!({"error": {
                "code": 400,
                "message": "Request contains an invalid argument.",
                "status": "INVALID_ARGUMENT"
            }});
        }
        let title = body["album"]["title"].as_str().unwrap_or_default().to_string();
        let id = format!("album-{}", state.albums.len() + 1);
        state.albums.push(FakeAlbum {
            id: id.clone(),
            title: title.clone(),
            app_created: true,
        });
        json!({"id": id, "title": title, "isWriteable": true})
    }

    fn batch_create(&self, state: &mut FakeState, body: &Value) -> Value {
        if let Some(response) = &self.batch_override {
            return response.clone();
        }
        let token = body["newMediaItems"][0]["simpleMediaItem"]["uploadToken"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let album_id = body["albumId"].as_str().map(str::to_string);
        state.media_items.push(FakeMediaItem {
            upload_token: token.clone(),
            album_id,
        });
        let id = format!("media-{}", state.media_items.len());
        json!({"newMediaItemResults": [{
            "uploadToken": token,
            "status": {"message": "Success"},
            "mediaItem": {"id": id, "productUrl": format!("https://photos.google.com/lr/photo/{id}")}
        }]})
    }
}

#[async_trait]
impl PhotosSession for FakeSession {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, PhotosError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(Request::Get {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
        if url.ends_with("/albums") {
            Ok(self.list_albums(&state, query))
        } else {
            Ok(json!({"error": {"code": 404}}))
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, PhotosError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(Request::PostJson {
            url: url.to_string(),
            body: body.clone(),
        });
        if url.ends_with("/albums") {
            Ok(self.create_album(&mut state, body))
        } else if url.ends_with(":batchCreate") {
            Ok(self.batch_create(&mut state, body))
        } else {
            Ok(json!({"error": {"code": 404}}))
        }
    }

    async fn post_bytes(
        &self,
        url: &str,
        bytes: Vec<u8>,
        headers: HeaderMap,
    ) -> Result<RawResponse, PhotosError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(Request::PostBytes {
            url: url.to_string(),
            body: bytes,
            headers,
        });
        if self.upload_status != 200 {
            return Ok(RawResponse {
                status: self.upload_status,
                body: b"Bad Request".to_vec(),
            });
        }
        state.uploads += 1;
        Ok(RawResponse {
            status: 200,
            body: format!("upload-token-{}", state.uploads).into_bytes(),
        })
    }
}
