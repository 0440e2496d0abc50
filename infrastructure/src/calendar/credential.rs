//! Calendar access credential.
//!
//! Loaded once when the backend is built. The bearer token lives in a
//! buffer that is zeroed when the credential is dropped, and it is never
//! printed by `Debug`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

/// Environment variable that overrides the token file.
pub const TOKEN_ENV_VAR: &str = "GOOGLE_CALENDAR_TOKEN";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("No calendar credential: set {env} or create {}", path.display())]
    NotFound { env: &'static str, path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid token file {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Deserialize)]
struct TokenFile {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

pub struct CalendarCredential {
    token: Zeroizing<String>,
}

impl CalendarCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
        }
    }

    /// Load from [`TOKEN_ENV_VAR`] if set, otherwise from `token_file`.
    pub fn load(token_file: &Path) -> Result<Self, CredentialError> {
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.trim().is_empty() => {
                debug!("Using calendar token from {}", TOKEN_ENV_VAR);
                Ok(Self::new(token.trim()))
            }
            _ if token_file.exists() => Self::from_token_file(token_file),
            _ => Err(CredentialError::NotFound {
                env: TOKEN_ENV_VAR,
                path: token_file.to_path_buf(),
            }),
        }
    }

    /// Read a `token.json` style file with an `access_token` or `token` field.
    pub fn from_token_file(path: &Path) -> Result<Self, CredentialError> {
        let content = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
            CredentialError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?);
        let parsed: TokenFile =
            serde_json::from_str(&content).map_err(|e| CredentialError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let token = parsed
            .access_token
            .or(parsed.token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| CredentialError::Invalid {
                path: path.to_path_buf(),
                reason: "no access_token or token field".to_string(),
            })?;
        debug!(path = %path.display(), "Loaded calendar token");
        Ok(Self::new(token))
    }

    pub(crate) fn bearer(&self) -> &str {
        self.token.as_str()
    }
}

impl std::fmt::Debug for CalendarCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarCredential")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_access_token_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"access_token": "ya29.abc", "refresh_token": "r"}}"#).unwrap();

        let credential = CalendarCredential::from_token_file(file.path()).unwrap();
        assert_eq!(credential.bearer(), "ya29.abc");
    }

    #[test]
    fn test_reads_token_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"token": "tok", "scopes": []}}"#).unwrap();

        let credential = CalendarCredential::from_token_file(file.path()).unwrap();
        assert_eq!(credential.bearer(), "tok");
    }

    #[test]
    fn test_file_without_token_is_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"client_id": "x"}}"#).unwrap();

        assert!(matches!(
            CalendarCredential::from_token_file(file.path()),
            Err(CredentialError::Invalid { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = CalendarCredential::new("secret-token");
        let printed = format!("{:?}", credential);
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("redacted"));
    }
}
