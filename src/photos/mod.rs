//! Photos Library client: album reconciliation and the upload pipeline on
//! top of an authorized [`PhotosSession`].

mod albums;
pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod session;
pub mod types;
mod upload;

pub use session::PhotosSession;
pub use upload::UploadOutcome;

use std::sync::Arc;

/// URLs of the Photos Library REST API.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    base: String,
}

impl ApiEndpoints {
    pub const GOOGLE_PHOTOS: &'static str = "https://photoslibrary.googleapis.com/v1";

    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn albums(&self) -> String {
        format!("{}/albums", self.base)
    }

    pub fn uploads(&self) -> String {
        format!("{}/uploads", self.base)
    }

    pub fn batch_create(&self) -> String {
        format!("{}/mediaItems:batchCreate", self.base)
    }
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::new(Self::GOOGLE_PHOTOS)
    }
}

/// Handle to one account's photo library.
///
/// The session is passed in explicitly and shared by reference counting, so
/// the same authorized session serves every cycle of the scheduler.
pub struct PhotosLibrary {
    session: Arc<dyn PhotosSession>,
    endpoints: ApiEndpoints,
}

impl std::fmt::Debug for PhotosLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotosLibrary")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl PhotosLibrary {
    pub fn new(session: Arc<dyn PhotosSession>, endpoints: ApiEndpoints) -> Self {
        Self { session, endpoints }
    }
}
