use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::error::PhotosError;
use super::types::RawResponse;
use crate::auth::AuthorizedSession;

/// Minimal async transport used by the photo library client.
///
/// Headers are passed per request; an implementation must not carry headers
/// from one call into the next.
#[async_trait]
pub trait PhotosSession: Send + Sync {
    /// `GET` a JSON endpoint. Non-2xx answers are still decoded as JSON.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, PhotosError>;

    /// `POST` a JSON body to a JSON endpoint.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, PhotosError>;

    /// `POST` raw bytes and return status and body verbatim.
    async fn post_bytes(
        &self,
        url: &str,
        bytes: Vec<u8>,
        headers: HeaderMap,
    ) -> Result<RawResponse, PhotosError>;
}

async fn decode_json(url: &str, response: reqwest::Response) -> Result<Value, PhotosError> {
    let body = response.bytes().await.map_err(|source| PhotosError::Http {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|source| PhotosError::Json {
        url: url.to_string(),
        source,
    })
}

#[async_trait]
impl PhotosSession for AuthorizedSession {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, PhotosError> {
        tracing::debug!("GET {}", url);
        let response = self
            .send(|c| c.get(url).query(query))
            .await
            .map_err(|e| PhotosError::from_auth(url, e))?;
        decode_json(url, response).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, PhotosError> {
        tracing::debug!("POST {}", url);
        let response = self
            .send(|c| c.post(url).json(body))
            .await
            .map_err(|e| PhotosError::from_auth(url, e))?;
        decode_json(url, response).await
    }

    async fn post_bytes(
        &self,
        url: &str,
        bytes: Vec<u8>,
        headers: HeaderMap,
    ) -> Result<RawResponse, PhotosError> {
        tracing::debug!(size_bytes = bytes.len(), "POST {}", url);
        let response = self
            .send(|c| c.post(url).headers(headers.clone()).body(bytes.clone()))
            .await
            .map_err(|e| PhotosError::from_auth(url, e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|source| PhotosError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::Router;
    use serde_json::json;

    use super::*;
    use crate::auth::credentials::{CredentialStore, StoredCredentials};
    use crate::auth::session::acquire_lock;
    use crate::photos::{ApiEndpoints, PhotosLibrary, UploadOutcome};

    type Seen = Arc<Mutex<Vec<(Method, String, HeaderMap)>>>;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("gphotos_timelapse_tests")
            .join("photos_session")
            .join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// A tiny stand-in for the Photos Library API that records every request.
    async fn fake_api(
        State(seen): State<Seen>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        _body: Bytes,
    ) -> Response {
        let path = uri.path().to_string();
        seen.lock()
            .unwrap()
            .push((method.clone(), path.clone(), headers));
        match (method, path.as_str()) {
            (Method::GET, "/v1/albums") => axum::Json(json!({})).into_response(),
            (Method::POST, "/v1/albums") => {
                axum::Json(json!({"id": "album-1", "title": "Garden Timelapse"})).into_response()
            }
            (Method::POST, "/v1/uploads") => "upload-token-1".into_response(),
            (Method::POST, "/v1/mediaItems:batchCreate") => axum::Json(json!({
                "newMediaItemResults": [{"status": {"message": "Success"}}]
            }))
            .into_response(),
            (Method::GET, "/v1/broken") => "<html>not json</html>".into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn spawn_api(seen: Seen) -> String {
        let app = Router::new().fallback(fake_api).with_state(seen);
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/v1")
    }

    async fn session_in(dir: &Path) -> AuthorizedSession {
        let creds = StoredCredentials {
            token: Some("valid".into()),
            refresh_token: "1//refresh".into(),
            id_token: None,
            scopes: Vec::new(),
            token_uri: "http://127.0.0.1:1/token".into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            expiry: None,
        };
        AuthorizedSession::new(
            reqwest::Client::new(),
            creds,
            CredentialStore::new(dir),
            acquire_lock(dir).await.unwrap(),
        )
    }

    #[tokio::test]
    async fn test_upload_headers_do_not_leak_into_later_requests() {
        let dir = test_dir("header_scope");
        let photo = dir.join("2025-06-01_1200.jpg");
        std::fs::write(&photo, b"jpeg bytes").unwrap();

        let seen: Seen = Arc::default();
        let base = spawn_api(seen.clone()).await;
        let library = PhotosLibrary::new(Arc::new(session_in(&dir).await), ApiEndpoints::new(base));

        let outcome = library
            .upload_photos(&[photo], Some("Garden Timelapse"))
            .await
            .unwrap();
        assert_eq!(outcome, UploadOutcome::Completed { added: 1, failed: 0 });

        // The next invocation's first call is an album listing.
        library.ensure_album("Garden Timelapse").await.unwrap();

        let seen = seen.lock().unwrap();
        let upload = seen
            .iter()
            .find(|(m, p, _)| *m == Method::POST && p == "/v1/uploads")
            .expect("raw upload request");
        assert_eq!(upload.2["x-goog-upload-protocol"], "raw");
        assert_eq!(upload.2["x-goog-upload-file-name"], "2025-06-01_1200.jpg");
        assert_eq!(upload.2["content-type"], "application/octet-stream");
        assert_eq!(upload.2["authorization"], "Bearer valid");

        let (_, _, last_headers) = seen.last().unwrap();
        assert!(last_headers.get("x-goog-upload-protocol").is_none());
        assert!(last_headers.get("x-goog-upload-file-name").is_none());
        assert_ne!(
            last_headers.get("content-type").map(|v| v.as_bytes()),
            Some(&b"application/octet-stream"[..])
        );
    }

    #[tokio::test]
    async fn test_non_json_body_propagates() {
        let dir = test_dir("non_json");
        let base = spawn_api(Arc::default()).await;
        let session = session_in(&dir).await;
        let err = session
            .get_json(&format!("{base}/broken"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PhotosError::Json { .. }), "got {err:?}");
    }
}
