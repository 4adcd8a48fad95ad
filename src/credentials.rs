//! Reads the Cursor session token from the editor's SQLite state store.
//!
//! The access token is a JWT kept in `ItemTable` under
//! `cursorAuth/accessToken`. The dashboard API authenticates with a cookie
//! built from the user id (the JWT `sub` claim) and the token itself.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::error::{UsageError, UsageResult};
use crate::utils::{cursor_state_db_path, env_string};

const ACCESS_TOKEN_KEY: &str = "cursorAuth/accessToken";
const TOKEN_ENV: &str = "CURSOR_USAGE_TOKEN";
const SESSION_COOKIE: &str = "WorkosCursorSessionToken";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    pub access_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a raw JWT, extracting the user id from `sub`
    pub fn from_jwt(token: &str) -> UsageResult<Self> {
        let token = token.trim().trim_matches('"');
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| UsageError::Credential("token is not a JWT".into()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| UsageError::Credential(format!("token payload: {e}")))?;
        let claims: serde_json::Value = serde_json::from_slice(&bytes)?;
        let sub = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .ok_or_else(|| UsageError::Credential("token has no sub claim".into()))?;
        // `auth0|user_XXXX` -> `user_XXXX`
        let user_id = sub.rsplit('|').next().unwrap_or(sub).to_string();
        if user_id.is_empty() {
            return Err(UsageError::Credential("empty user id".into()));
        }
        Ok(Self {
            user_id,
            access_token: token.to_string(),
        })
    }

    /// `Cookie` header value for the dashboard API
    pub fn session_cookie(&self) -> String {
        format!(
            "{SESSION_COOKIE}={}%3A%3A{}",
            self.user_id, self.access_token
        )
    }
}

/// Where the refresh loop gets its token. `Ok(None)` means "not logged in".
pub trait CredentialSource {
    fn token(&self) -> UsageResult<Option<Credentials>>;
}

/// Env override first, then Cursor's `state.vscdb`
#[derive(Debug, Clone)]
pub struct StateDbCredentials {
    db_path: Option<PathBuf>,
}

impl StateDbCredentials {
    pub fn new(db_path: Option<PathBuf>) -> Self {
        Self { db_path }
    }

    pub fn from_env() -> Self {
        Self::new(cursor_state_db_path())
    }
}

impl CredentialSource for StateDbCredentials {
    fn token(&self) -> UsageResult<Option<Credentials>> {
        if let Some(raw) = env_string(TOKEN_ENV) {
            tracing::debug!("using token from {TOKEN_ENV}");
            return Credentials::from_jwt(&raw).map(Some);
        }
        let Some(path) = self.db_path.as_deref() else {
            return Ok(None);
        };
        match read_access_token(path)? {
            Some(raw) => Credentials::from_jwt(&raw).map(Some),
            None => Ok(None),
        }
    }
}

/// Raw access token from the state database, if the user is logged in
pub fn read_access_token(db_path: &Path) -> UsageResult<Option<String>> {
    if !db_path.is_file() {
        tracing::debug!(path = %db_path.display(), "state database not found");
        return Ok(None);
    }
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(std::time::Duration::from_millis(2000))?;
    let value = conn
        .query_row(
            "SELECT value FROM ItemTable WHERE key = ?1",
            params![ACCESS_TOKEN_KEY],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}
