use std::path::{Path, PathBuf};

use chrono::Utc;
use fs4::fs_std::FileExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::Mutex;

use super::credentials::{CredentialStore, StoredCredentials};
use super::endpoints::LOCK_FILE;
use super::error::AuthError;
use super::flow;

/// Take the exclusive instance lock for a credentials directory.
///
/// The advisory lock lives as long as the returned file handle and is
/// released automatically when it is dropped.
pub async fn acquire_lock(credentials_dir: &Path) -> Result<std::fs::File, AuthError> {
    let lock_path = credentials_dir.join(LOCK_FILE);
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::create(&lock_path)?;
        file.try_lock_exclusive()
            .map_err(|_| AuthError::Locked(lock_path.clone()))?;
        Ok::<std::fs::File, AuthError>(file)
    })
    .await
    .map_err(|e| AuthError::Io(std::io::Error::other(e)))?
}

/// HTTP session that attaches a bearer token to every request and keeps the
/// token fresh, persisting each refresh so a restart never needs the browser.
pub struct AuthorizedSession {
    client: Client,
    credentials: Mutex<StoredCredentials>,
    store: CredentialStore,
    /// Held only to keep the instance lock alive.
    #[allow(dead_code)]
    lock_file: std::fs::File,
}

impl std::fmt::Debug for AuthorizedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedSession")
            .field("credentials", &"<redacted>")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl AuthorizedSession {
    pub fn new(
        client: Client,
        credentials: StoredCredentials,
        store: CredentialStore,
        lock_file: std::fs::File,
    ) -> Self {
        Self {
            client,
            credentials: Mutex::new(credentials),
            store,
            lock_file,
        }
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    /// Return a usable access token, refreshing it first if it is missing or
    /// about to expire.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut creds = self.credentials.lock().await;
        if creds.needs_refresh(Utc::now()) {
            self.refresh_locked(&mut creds).await?;
        }
        Ok(creds.token.clone().unwrap_or_default())
    }

    /// Refresh after the server rejected `stale`, unless a concurrent caller
    /// already replaced it.
    async fn refresh_rejected(&self, stale: &str) -> Result<String, AuthError> {
        let mut creds = self.credentials.lock().await;
        if creds.token.as_deref() == Some(stale) {
            self.refresh_locked(&mut creds).await?;
        }
        Ok(creds.token.clone().unwrap_or_default())
    }

    async fn refresh_locked(&self, creds: &mut StoredCredentials) -> Result<(), AuthError> {
        flow::refresh_credentials(&self.client, creds).await?;
        if let Err(e) = self.store.save(creds).await {
            tracing::debug!("Could not save auth tokens - {}", e);
        }
        Ok(())
    }

    /// Authorize and send the request produced by `build`.
    ///
    /// A 401 answer triggers one token refresh and one resend; any other
    /// status is returned to the caller untouched.
    pub async fn send<F>(&self, build: F) -> Result<Response, AuthError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.access_token().await?;
        let response = build(&self.client).bearer_auth(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("Access token rejected, refreshing");
        let token = self.refresh_rejected(&token).await?;
        Ok(build(&self.client).bearer_auth(&token).send().await?)
    }
}
