//! OAuth1 credential file: consumer key/secret plus token/token-secret, stored as `serde_json`
//! with 0600 permissions. Any read error is logged and treated as "not logged in" rather than
//! propagated, since a corrupt or missing credential file should prompt a re-login, not a crash.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ErrorKind;
use crate::remote::signer::OAuth1Credentials;
use crate::util::write_atomic;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub oauth_token: String,
    pub oauth_token_secret: String,
}

impl From<Credentials> for OAuth1Credentials {
    fn from(c: Credentials) -> Self {
        OAuth1Credentials {
            consumer_key: c.consumer_key,
            consumer_secret: c.consumer_secret,
            oauth_token: c.oauth_token,
            oauth_token_secret: c.oauth_token_secret,
        }
    }
}

impl Credentials {
    pub fn load(path: &Path) -> Option<Credentials> {
        if !path.exists() {
            return None;
        }
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(creds) => Some(creds),
                Err(e) => {
                    warn!(error = %e, "could not parse credentials file, treating as logged out");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "could not read credentials file, treating as logged out");
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ErrorKind> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| ErrorKind::LocalIO(format!("could not serialize credentials: {e}")))?;
        write_atomic(path, &bytes)?;
        restrict_permissions(path);
        Ok(())
    }

    pub fn delete(path: &Path) -> Result<(), ErrorKind> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        warn!(error = %e, "could not restrict credentials file permissions to 0600");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credentials {
        Credentials {
            consumer_key: "key".into(),
            consumer_secret: "secret".into(),
            oauth_token: "token".into(),
            oauth_token_secret: "token_secret".into(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        sample().save(&path).unwrap();

        let loaded = Credentials::load(&path).unwrap();
        assert_eq!(loaded.consumer_key, "key");
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        assert!(Credentials::load(&path).is_none());
    }

    #[test]
    fn delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        sample().save(&path).unwrap();
        Credentials::delete(&path).unwrap();
        assert!(!path.exists());
    }
}
