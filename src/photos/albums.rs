use futures_util::stream::{self, Stream, TryStreamExt};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::error::PhotosError;
use super::types::{Album, AlbumId, AlbumListResponse};
use super::PhotosLibrary;

/// Position in the paginated album listing.
enum PageCursor {
    First,
    Next(String),
    Exhausted,
}

impl PhotosLibrary {
    /// Lazily list albums, following `nextPageToken` until the service stops
    /// returning one. A page without `albums` ends the listing.
    ///
    /// Every call starts a fresh listing; nothing is cached between calls.
    pub fn albums(
        &self,
        app_created_only: bool,
    ) -> impl Stream<Item = Result<Album, PhotosError>> + '_ {
        stream::try_unfold(PageCursor::First, move |cursor| {
            self.fetch_album_page(app_created_only, cursor)
        })
        .map_ok(|albums| stream::iter(albums.into_iter().map(Ok::<Album, PhotosError>)))
        .try_flatten()
    }

    async fn fetch_album_page(
        &self,
        app_created_only: bool,
        cursor: PageCursor,
    ) -> Result<Option<(Vec<Album>, PageCursor)>, PhotosError> {
        let mut query = vec![("excludeNonAppCreatedData", app_created_only.to_string())];
        match cursor {
            PageCursor::Exhausted => return Ok(None),
            PageCursor::First => {}
            PageCursor::Next(token) => query.push(("pageToken", token)),
        }

        let url = self.endpoints.albums();
        let response = self.session.get_json(&url, &query).await?;
        debug!("Server response: {}", response);

        let page: AlbumListResponse =
            serde_json::from_value(response).map_err(|source| PhotosError::Shape { url, source })?;
        let Some(albums) = page.albums else {
            return Ok(None);
        };
        let next = match page.next_page_token {
            Some(token) => PageCursor::Next(token),
            None => PageCursor::Exhausted,
        };
        Ok(Some((albums, next)))
    }

    /// Find an app-created album whose title matches `title` ignoring case,
    /// or create one.
    ///
    /// Returns `Ok(None)` when `title` is empty, or when the service refused
    /// to create the album (the raw response is logged).
    pub async fn ensure_album(&self, title: &str) -> Result<Option<AlbumId>, PhotosError> {
        if title.is_empty() {
            return Ok(None);
        }

        let wanted = title.to_lowercase();
        let albums = self.albums(true);
        tokio::pin!(albums);
        while let Some(album) = albums.try_next().await? {
            if album.title.to_lowercase() == wanted {
                info!("Uploading into EXISTING photo album -- '{}'", title);
                return Ok(Some(album.id));
            }
        }

        self.create_album(title).await
    }

    /// Create an album. A response without an `id` is reported as `Ok(None)`.
    pub async fn create_album(&self, title: &str) -> Result<Option<AlbumId>, PhotosError> {
        let url = self.endpoints.albums();
        let body = json!({"album": {"title": title}});
        let response = self.session.post_json(&url, &body).await?;
        debug!("Server response: {}", response);

        match response.get("id").and_then(Value::as_str) {
            Some(id) => {
                info!("Uploading into NEW photo album -- '{}'", title);
                Ok(Some(AlbumId::from(id)))
            }
            None => {
                error!(
                    "Could not find or create photo album '{}'. Server response: {}",
                    title, response
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::photos::fake::{FakeSession, Request};
    use crate::photos::ApiEndpoints;

    fn library(fake: &Arc<FakeSession>) -> PhotosLibrary {
        PhotosLibrary::new(fake.clone(), ApiEndpoints::default())
    }

    #[tokio::test]
    async fn test_listing_follows_page_tokens() {
        let fake = Arc::new(
            FakeSession::new()
                .with_album("a1", "One", true)
                .with_album("a2", "Two", true)
                .with_album("a3", "Three", true)
                .with_album("a4", "Four", false)
                .page_size(2),
        );
        let lib = library(&fake);

        let all: Vec<Album> = lib.albums(false).try_collect().await.unwrap();
        let titles: Vec<&str> = all.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["One", "Two", "Three", "Four"]);
        assert_eq!(fake.count("/albums"), 2);

        let requests = fake.requests();
        match &requests[1] {
            Request::Get { query, .. } => {
                assert!(query.contains(&("pageToken".to_string(), "2".to_string())));
                assert!(query.contains(&("excludeNonAppCreatedData".to_string(), "false".to_string())));
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_listing_is_restartable() {
        let fake = Arc::new(FakeSession::new().with_album("a1", "One", true).page_size(1));
        let lib = library(&fake);
        let first: Vec<Album> = lib.albums(true).try_collect().await.unwrap();
        let second: Vec<Album> = lib.albums(true).try_collect().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_album_matched_case_insensitively() {
        let fake = Arc::new(FakeSession::new().with_album("garden", "Garden Timelapse", true));
        let lib = library(&fake);

        let id = lib.ensure_album("garden timelapse").await.unwrap();
        assert_eq!(id, Some(AlbumId::from("garden")));
        assert_eq!(fake.albums().len(), 1);
        assert_eq!(fake.count("/albums"), 1, "no create call expected");
    }

    #[tokio::test]
    async fn test_first_match_wins_and_scanning_stops() {
        let fake = Arc::new(
            FakeSession::new()
                .with_album("first", "Garden", true)
                .with_album("second", "GARDEN", true)
                .with_album("x", "Other", true)
                .page_size(1),
        );
        let lib = library(&fake);
        assert_eq!(
            lib.ensure_album("garden").await.unwrap(),
            Some(AlbumId::from("first"))
        );
        // Only the first page was fetched.
        assert_eq!(fake.count("/albums"), 1);
    }

    #[tokio::test]
    async fn test_albums_not_created_by_app_are_ignored() {
        let fake = Arc::new(FakeSession::new().with_album("shared", "Garden Timelapse", false));
        let lib = library(&fake);
        let id = lib.ensure_album("Garden Timelapse").await.unwrap().unwrap();
        assert_ne!(id.as_str(), "shared");
        assert_eq!(fake.albums().len(), 2);
    }

    #[tokio::test]
    async fn test_ensure_album_is_idempotent() {
        let fake = Arc::new(FakeSession::new());
        let lib = library(&fake);

        let first = lib.ensure_album("Garden Timelapse").await.unwrap();
        let second = lib.ensure_album("Garden Timelapse").await.unwrap();
        let third = lib.ensure_album("GARDEN TIMELAPSE").await.unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(first, third);

        let matching = fake
            .albums()
            .iter()
            .filter(|a| a.title.to_lowercase() == "garden timelapse")
            .count();
        assert_eq!(matching, 1);
    }

    #[tokio::test]
    async fn test_create_failure_returns_none() {
        let fake = Arc::new(FakeSession::new().rejecting_album_creation());
        let lib = library(&fake);
        assert_eq!(lib.ensure_album("Garden Timelapse").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_title_means_no_album() {
        let fake = Arc::new(FakeSession::new());
        let lib = library(&fake);
        assert_eq!(lib.ensure_album("").await.unwrap(), None);
        assert!(fake.requests().is_empty());
    }
}
