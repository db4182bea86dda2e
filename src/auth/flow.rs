//! Installed-application OAuth flow.
//!
//! Prints the Google consent URL, waits for the browser to be redirected to a
//! one-shot loopback server, then exchanges the authorization code for tokens.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use super::credentials::{ClientSecrets, StoredCredentials, TokenResponse};
use super::endpoints::{redirect_uri, CALLBACK_HOST, SCOPES};
use super::error::AuthError;

const SUCCESS_MESSAGE: &str = "The auth flow is complete; you may close this window.";

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Run the interactive flow and return freshly minted credentials.
pub async fn authorize_interactively(
    http: &Client,
    secrets: &ClientSecrets,
    port: u16,
) -> Result<StoredCredentials, AuthError> {
    let redirect = redirect_uri(port);
    let state = Uuid::new_v4().simple().to_string();
    let url = authorization_url(secrets, &redirect, &state)?;

    let listener = TcpListener::bind((CALLBACK_HOST, port)).await?;
    println!("Please visit this URL to authorize this application:\n{url}");
    tracing::info!("Waiting for authorization callback on {}", redirect);

    let params = wait_for_callback(listener).await?;
    let code = validate_callback(params, &state)?;

    let form = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("redirect_uri", redirect.as_str()),
    ];
    let response = request_token(http, &secrets.token_uri, &form).await?;
    tracing::info!("Authorization granted");
    StoredCredentials::from_token_response(secrets, response, Utc::now())
}

/// Exchange the refresh token for a new access token and merge it into `creds`.
pub async fn refresh_credentials(
    http: &Client,
    creds: &mut StoredCredentials,
) -> Result<(), AuthError> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", creds.refresh_token.as_str()),
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
    ];
    let response = request_token(http, &creds.token_uri, &form).await?;
    creds.apply_token_response(response, Utc::now());
    tracing::debug!("Access token refreshed");
    Ok(())
}

fn authorization_url(
    secrets: &ClientSecrets,
    redirect_uri: &str,
    state: &str,
) -> Result<Url, AuthError> {
    let scope = SCOPES.join(" ");
    let url = Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )?;
    Ok(url)
}

async fn request_token(
    http: &Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let response = http.post(token_uri).form(form).send().await?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AuthError::TokenEndpoint {
            code: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<TokenResponse>().await?)
}

/// Serve the redirect URI until the first callback arrives.
async fn wait_for_callback(listener: TcpListener) -> Result<CallbackParams, AuthError> {
    let (tx, mut rx) = mpsc::channel::<CallbackParams>(1);
    let app = Router::new()
        .route("/", get(handle_callback))
        .with_state(tx);

    let shutdown = CancellationToken::new();
    let server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        }
    });

    let params = rx.recv().await;
    shutdown.cancel();
    match tokio::time::timeout(Duration::from_secs(5), server).await {
        Ok(Ok(Err(e))) => tracing::debug!("Callback server error: {}", e),
        Ok(Err(e)) => tracing::debug!("Callback server task failed: {}", e),
        Err(_) => tracing::debug!("Callback server did not stop within 5s"),
        Ok(Ok(Ok(()))) => {}
    }

    params.ok_or_else(|| AuthError::Denied("callback server stopped unexpectedly".into()))
}

async fn handle_callback(
    State(tx): State<mpsc::Sender<CallbackParams>>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    // Only the first callback counts; later hits are answered and dropped.
    let _ = tx.try_send(params);
    Html(SUCCESS_MESSAGE)
}

fn validate_callback(params: CallbackParams, expected_state: &str) -> Result<String, AuthError> {
    if let Some(error) = params.error {
        return Err(AuthError::Denied(error));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    params
        .code
        .ok_or_else(|| AuthError::Denied("no authorization code in callback".into()))
}
