//! On-disk master key storage
//!
//! The key file holds the base64-encoded 32-byte key and nothing else. It is
//! written owner-only (0600, directory 0700 on Unix) through a unique temp
//! file and rename, so a half-written or world-readable key is never left in
//! place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use zeroize::Zeroize;

use crate::error::{SecretsError, SecretsResult};

/// Default key file name inside the key directory
pub const DEFAULT_KEY_FILE: &str = "master.key";

#[derive(Debug, Clone)]
pub struct KeyStorage {
    key_path: PathBuf,
}

impl KeyStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_file_name(dir, DEFAULT_KEY_FILE)
    }

    pub fn with_file_name(dir: impl Into<PathBuf>, file_name: &str) -> Self {
        Self {
            key_path: dir.into().join(file_name),
        }
    }

    /// Whether the key file exists. Says nothing about whether it parses.
    pub fn has_key(&self) -> bool {
        self.key_path.is_file()
    }

    /// Atomically write the base64 key with owner-only permissions.
    ///
    /// Each call writes its own uniquely named temp file in the key
    /// directory, so concurrent saves never interleave bytes; the last
    /// rename wins.
    pub fn save_key(&self, key_b64: &str) -> SecretsResult<()> {
        let dir = self.key_path.parent().unwrap_or(Path::new("."));
        create_private_dir(dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".key-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        restrict_to_owner(tmp.as_file(), 0o600)?;
        tmp.write_all(key_b64.as_bytes())?;
        tmp.as_file().sync_all()?;
        // on failure the temp file is removed when `PersistError` drops
        tmp.persist(&self.key_path).map_err(|e| e.error)?;

        tracing::debug!(path = %self.key_path.display(), "saved master key");
        Ok(())
    }

    /// Read the base64 key. Fails with [`SecretsError::KeyNotFound`] if absent.
    pub fn load_key(&self) -> SecretsResult<String> {
        if !self.has_key() {
            return Err(SecretsError::KeyNotFound(self.key_path.clone()));
        }
        let mut content = fs::read_to_string(&self.key_path)?;
        let key = content.trim().to_string();
        content.zeroize();
        Ok(key)
    }

    /// Remove the key file. Removing an absent key is not an error.
    pub fn delete_key(&self) -> SecretsResult<()> {
        match fs::remove_file(&self.key_path) {
            Ok(()) => {
                tracing::debug!(path = %self.key_path.display(), "deleted master key");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolved key file path, for status messages.
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

    if !dir.is_dir() {
        return fs::DirBuilder::new().recursive(true).mode(0o700).create(dir);
    }

    // the default key dir doubles as the config dir, which may predate us
    let mode = fs::metadata(dir)?.permissions().mode();
    if mode & 0o077 != 0 {
        if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
            tracing::warn!(
                path = %dir.display(),
                mode = format_args!("{:o}", mode & 0o777),
                "key directory is accessible to other users and could not be restricted: {e}"
            );
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn restrict_to_owner(file: &fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
