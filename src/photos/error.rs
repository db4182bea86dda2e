use thiserror::Error;

use crate::auth::error::AuthError;

/// Failures that escape the photo library client.
///
/// Anything in here propagates out of `upload_photos`; per-file problems
/// (unreadable file, rejected upload, failed item status) are logged inside
/// the pipeline and never become a `PhotosError`.
#[derive(Debug, Error)]
pub enum PhotosError {
    #[error("HTTP error calling {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Response from {url} is not valid JSON: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },

    #[error("Unexpected response shape from {url}: {source}")]
    Shape {
        url: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Auth(AuthError),
}

impl PhotosError {
    /// Classify an error from the authorized session, keeping transport
    /// failures attributed to the URL that was being called.
    pub fn from_auth(url: &str, err: AuthError) -> Self {
        match err {
            AuthError::Http(source) => PhotosError::Http {
                url: url.to_string(),
                source,
            },
            other => PhotosError::Auth(other),
        }
    }
}
