//! Credential Store
//!
//! File-based token storage at a fixed path per integration. The file is the
//! only durable authorization state; deleting it forces re-authentication.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::credential::Credential;
use crate::common::StoreError;

/// Durable home for the credential.
///
/// `load` yields `StoreError::NotFound` or `StoreError::CorruptState` when no
/// usable credential exists; both satisfy [`StoreError::is_absent`].
pub trait CredentialStore {
    fn load(&self) -> Result<Credential, StoreError>;
    fn save(&self, credential: &Credential) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Credential, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no token file");
                return Err(StoreError::NotFound(self.path.clone()));
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token file unreadable");
                return Err(StoreError::CorruptState {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        match serde_json::from_str::<Credential>(&content) {
            Ok(credential) => {
                info!(path = %self.path.display(), "loaded credential");
                Ok(credential)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token file does not parse");
                Err(StoreError::CorruptState {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_private_dir(parent)?;
            }
        }

        // Write to temp file first, then rename
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(credential)?;
        {
            let mut file = create_private_file(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.path)?;
        debug!(path = %self.path.display(), "saved credential");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "cleared credential");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Create `path` readable by the owner only. A leftover temp file or a
/// symlink planted at `path` is removed first, never followed.
fn create_private_file(path: &Path) -> std::io::Result<File> {
    match fs::remove_file(path) {
        Ok(()) => warn!(path = %path.display(), "removed stale temp file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn credential() -> Credential {
        Credential {
            access_token: "ya29.test".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expiry: Some(Utc::now() + Duration::hours(1)),
            scopes: vec!["https://www.googleapis.com/auth/calendar".to_string()],
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("calendar_token.json"));

        let cred = credential();
        store.save(&cred).unwrap();
        assert_eq!(store.load().unwrap(), cred);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        store.save(&credential()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn temp_file_is_private_from_creation() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json.tmp");
        let _file = create_private_file(&path).unwrap();

        // Checked before any content is written
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn token_directory_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join(".calmail");
        let store = FileCredentialStore::new(home.join("token.json"));
        store.save(&credential()).unwrap();

        let mode = fs::metadata(&home).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
        assert!(!home.join("token.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn planted_symlink_at_temp_path_is_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = dir.path().join("elsewhere.txt");
        fs::write(&elsewhere, "untouched").unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        std::os::unix::fs::symlink(&elsewhere, dir.path().join("token.json.tmp")).unwrap();

        store.save(&credential()).unwrap();

        assert_eq!(fs::read_to_string(&elsewhere).unwrap(), "untouched");
        assert_eq!(store.load().unwrap(), credential());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(err.is_absent());
    }

    #[test]
    fn garbage_file_is_corrupt_and_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{\"token\": ").unwrap();

        let err = FileCredentialStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::CorruptState { .. }));
        assert!(err.is_absent());
    }

    #[test]
    fn directory_in_place_of_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::create_dir(&path).unwrap();

        assert!(FileCredentialStore::new(&path).load().unwrap_err().is_absent());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        store.save(&credential()).unwrap();

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }
}
