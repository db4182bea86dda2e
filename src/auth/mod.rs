//! Google OAuth for the photo library.
//!
//! Persisted credentials are reused across runs; the browser-based flow only
//! runs when nothing usable is on disk:
//! load `auth_session_secret.json` → validate/refresh → (fallback) interactive
//! consent with `client_id_secret.json` → persist.

pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod flow;
pub mod session;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use self::credentials::{ClientSecrets, CredentialStore};
use self::endpoints::CLIENT_SECRET_FILE;
use self::error::AuthError;
pub use self::session::AuthorizedSession;

const USER_AGENT: &str = concat!("gphotos-timelapse/", env!("CARGO_PKG_VERSION"));

/// Inputs for [`authorize`].
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub credentials_dir: PathBuf,
    pub oauth_port: u16,
    pub http_timeout: Duration,
}

/// Produce an authorized session for the credentials directory.
///
/// 1. Takes the per-directory instance lock.
/// 2. Loads persisted credentials and checks that a token can be obtained.
///    A transport failure here is not fatal; the session is returned as is.
/// 3. If nothing usable exists, runs the interactive flow (TTY required).
/// 4. Persists the resulting credentials.
pub async fn authorize(options: &AuthOptions) -> Result<AuthorizedSession> {
    let dir = &options.credentials_dir;
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create credentials directory: {}", dir.display()))?;

    let lock_file = session::acquire_lock(dir).await?;

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(options.http_timeout)
        .build()?;
    let store = CredentialStore::new(dir);

    if let Some(creds) = store.load().await {
        let session = AuthorizedSession::new(client.clone(), creds, store.clone(), lock_file);
        let validated = session.access_token().await;
        match validated {
            Ok(_) => {
                tracing::debug!("Persisted credentials are valid");
                return Ok(session);
            }
            Err(e @ AuthError::TokenEndpoint { .. }) => {
                tracing::warn!("Persisted credentials were rejected: {}", e);
                // Hand the lock back so the fresh session can re-take it.
                drop(session);
                let lock_file = session::acquire_lock(dir).await?;
                return authorize_fresh(options, client, store, lock_file).await;
            }
            Err(e @ (AuthError::Http(_) | AuthError::Io(_))) => {
                // Offline at startup: the next request refreshes again.
                tracing::warn!("Could not refresh persisted credentials, will retry on first request: {}", e);
                return Ok(session);
            }
            Err(e) => return Err(e.into()),
        }
    }

    authorize_fresh(options, client, store, lock_file).await
}

async fn authorize_fresh(
    options: &AuthOptions,
    client: Client,
    store: CredentialStore,
    lock_file: std::fs::File,
) -> Result<AuthorizedSession> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!(
            "No valid credentials in {}.\n\
             Run `gphotos-timelapse --auth-only` interactively to authorize,\n\
             then restart the service.",
            options.credentials_dir.display()
        );
    }

    let secrets = ClientSecrets::load(&options.credentials_dir.join(CLIENT_SECRET_FILE)).await?;
    let creds = flow::authorize_interactively(&client, &secrets, options.oauth_port).await?;

    if let Err(e) = store.save(&creds).await {
        tracing::debug!("Could not save auth tokens - {}", e);
    }
    Ok(AuthorizedSession::new(client, creds, store, lock_file))
}
