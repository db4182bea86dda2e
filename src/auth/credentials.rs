use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::endpoints::{DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI, SESSION_SECRET_FILE};
use super::error::AuthError;

/// Refresh this long before the server-side expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

/// Authorized-user credentials persisted in `auth_session_secret.json`.
///
/// The field names match the authorized-user JSON written by Google's own
/// client libraries, so a file produced by either side loads in the other.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(default)]
    pub token: Option<String>,
    pub refresh_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// Successful response from the OAuth token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl StoredCredentials {
    /// Build credentials from the first token exchange of the interactive flow.
    pub fn from_token_response(
        secrets: &ClientSecrets,
        response: TokenResponse,
        now: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let refresh_token = response
            .refresh_token
            .clone()
            .ok_or(AuthError::MissingRefreshToken)?;
        let mut creds = Self {
            token: None,
            refresh_token,
            id_token: None,
            scopes: Vec::new(),
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            expiry: None,
        };
        creds.apply_token_response(response, now);
        Ok(creds)
    }

    /// Whether the access token is missing or about to expire.
    ///
    /// A token without a recorded expiry is assumed valid; the server's 401
    /// decides otherwise.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => true,
            (Some(_), Some(expiry)) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            (Some(_), None) => false,
        }
    }

    /// Merge a token endpoint response. The refresh token is only replaced
    /// when the server rotates it.
    pub fn apply_token_response(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.token = Some(response.access_token);
        self.expiry = response.expires_in.map(|secs| now + Duration::seconds(secs));
        if let Some(refresh) = response.refresh_token {
            self.refresh_token = refresh;
        }
        if response.id_token.is_some() {
            self.id_token = response.id_token;
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

/// OAuth client descriptor downloaded from the Google Cloud console.
#[derive(Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Deserialize)]
struct ClientSecretFile {
    #[serde(default)]
    installed: Option<ClientSecrets>,
    #[serde(default)]
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub async fn load(path: &Path) -> Result<Self, AuthError> {
        let contents =
            fs::read_to_string(path)
                .await
                .map_err(|source| AuthError::ClientSecretUnreadable {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::parse(path, &contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile =
            serde_json::from_str(contents).map_err(|e| AuthError::InvalidClientSecret {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        file.installed
            .or(file.web)
            .ok_or_else(|| AuthError::InvalidClientSecret {
                path: path.to_path_buf(),
                reason: "expected an \"installed\" or \"web\" section".to_string(),
            })
    }
}

/// Reads and writes `auth_session_secret.json` inside the credentials directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(credentials_dir: &Path) -> Self {
        Self {
            path: credentials_dir.join(SESSION_SECRET_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load persisted credentials.
    ///
    /// Any problem with the file is reported at debug level and yields
    /// `None`, which sends the caller down the interactive flow.
    pub async fn load(&self) -> Option<StoredCredentials> {
        if !self.path.exists() {
            return None;
        }
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("Error opening auth token file - {}", e);
                return None;
            }
        };
        match serde_json::from_str::<StoredCredentials>(&contents) {
            Ok(creds) => {
                tracing::debug!("Loaded credentials from {}", self.path.display());
                Some(creds)
            }
            Err(e) => {
                tracing::debug!("Error loading auth tokens - incorrect format: {}", e);
                None
            }
        }
    }

    pub async fn save(&self, creds: &StoredCredentials) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(creds)?;
        fs::write(&self.path, json).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }
        tracing::debug!("Saved credentials to {}", self.path.display());
        Ok(())
    }
}
