//! Google OAuth constants used when the client secret file omits them.

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scopes requested for the photo library: upload, album creation and
/// listing of app-created albums.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/photoslibrary",
    "https://www.googleapis.com/auth/photoslibrary.sharing",
];

/// File names inside the credentials directory.
pub const CLIENT_SECRET_FILE: &str = "client_id_secret.json";
pub const SESSION_SECRET_FILE: &str = "auth_session_secret.json";
pub const LOCK_FILE: &str = "gphotos-timelapse.lock";

/// Callback server address, used literally in the redirect URI.
pub const CALLBACK_HOST: &str = "127.0.0.1";

/// Loopback redirect URI for the installed-app flow.
pub fn redirect_uri(port: u16) -> String {
    format!("http://{CALLBACK_HOST}:{port}/")
}
