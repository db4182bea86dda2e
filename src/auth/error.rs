use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while obtaining or refreshing Google OAuth credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read client secret file {path}: {source}")]
    ClientSecretUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Client secret file {path} is not a valid OAuth client descriptor: {reason}")]
    InvalidClientSecret { path: PathBuf, reason: String },

    #[error("Authorization was denied: {0}")]
    Denied(String),

    #[error("Authorization callback state did not match the request")]
    StateMismatch,

    #[error("Token endpoint rejected the request (HTTP {code}): {message}")]
    TokenEndpoint { code: u16, message: String },

    #[error("Token endpoint returned no refresh token")]
    MissingRefreshToken,

    #[error("Invalid authorization URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Another gphotos-timelapse instance is using {0}")]
    Locked(PathBuf),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
