//! EncryptionService: the single entry point the rest of tasklock uses for E2EE
//!
//! Lifecycle:
//! ```text
//!   NoKey --setup()+confirm+save_manager()--> KeyReady
//!   NoKey --recover()+save_manager()--------> KeyReady
//!   KeyReady --delete_key()-----------------> NoKey
//! ```
//! `setup` and `recover` never persist; the caller decides when to commit.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tasklock_core::config::E2eeConfig;
use tasklock_crypto::{EncryptedData, EncryptionManager};

use crate::error::{SecretsError, SecretsResult};
use crate::key_store::KeyStorage;

/// Diagnostic snapshot returned by [`EncryptionService::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionStatus {
    pub enabled: bool,
    pub key_file_exists: bool,
    /// Set only when the key file exists.
    pub key_file_path: Option<PathBuf>,
    pub key_valid: bool,
    pub error: Option<String>,
}

pub struct EncryptionService {
    storage: KeyStorage,
    cached: Mutex<Option<Arc<EncryptionManager>>>,
}

impl EncryptionService {
    pub fn new(storage: KeyStorage) -> Self {
        Self {
            storage,
            cached: Mutex::new(None),
        }
    }

    /// Service over the key file the config (and `$TASKLOCK_KEY_DIR`) points at.
    pub fn from_config(config: &E2eeConfig) -> Self {
        Self::new(crate::key_storage_from_config(config))
    }

    pub fn storage(&self) -> &KeyStorage {
        &self.storage
    }

    fn cache(&self) -> MutexGuard<'_, Option<Arc<EncryptionManager>>> {
        // a panic while holding the lock cannot leave the Option half-written
        self.cached.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The loaded manager, reading the key file on first use.
    pub fn manager(&self) -> SecretsResult<Arc<EncryptionManager>> {
        let mut cached = self.cache();
        if let Some(manager) = cached.as_ref() {
            return Ok(Arc::clone(manager));
        }

        let manager = Arc::new(self.load_manager()?);
        *cached = Some(Arc::clone(&manager));
        Ok(manager)
    }

    fn load_manager(&self) -> SecretsResult<EncryptionManager> {
        let key_b64 = self.storage.load_key()?;
        let manager = EncryptionManager::from_base64_key(&key_b64)?;
        tracing::debug!(
            path = %self.storage.key_path().display(),
            fingerprint = %manager.master_key().fingerprint(),
            "loaded master key"
        );
        Ok(manager)
    }

    /// Drop the cached manager; the next use re-reads the key file.
    pub fn invalidate(&self) {
        self.cache().take();
    }

    /// Drop the cache and load the key file again immediately.
    pub fn reload(&self) -> SecretsResult<Arc<EncryptionManager>> {
        self.invalidate();
        self.manager()
    }

    /// True iff a key file exists and loads into a valid manager.
    pub fn is_enabled(&self) -> bool {
        if !self.storage.has_key() {
            return false;
        }
        match self.manager() {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("encryption key present but unusable: {e}");
                false
            }
        }
    }

    pub fn status(&self) -> EncryptionStatus {
        let key_file_exists = self.storage.has_key();
        let (key_valid, error) = if key_file_exists {
            match self.manager() {
                Ok(_) => (true, None),
                Err(e) => (false, Some(e.to_string())),
            }
        } else {
            (false, None)
        };

        EncryptionStatus {
            enabled: key_valid,
            key_file_exists,
            key_file_path: key_file_exists.then(|| self.storage.key_path().to_path_buf()),
            key_valid,
            error,
        }
    }

    /// Generate a new manager and its recovery phrase. Nothing is persisted
    /// until [`EncryptionService::save_manager`] is called.
    pub fn setup(&self) -> SecretsResult<(EncryptionManager, String)> {
        Ok(EncryptionManager::generate()?)
    }

    /// Persist `manager`'s key and make it the cached manager.
    pub fn save_manager(&self, manager: EncryptionManager) -> SecretsResult<()> {
        let mut cached = self.cache();
        self.storage.save_key(&manager.export_key())?;
        tracing::debug!(
            path = %self.storage.key_path().display(),
            fingerprint = %manager.master_key().fingerprint(),
            "master key saved"
        );
        *cached = Some(Arc::new(manager));
        Ok(())
    }

    /// Rebuild a manager from a user-supplied phrase. Not persisted.
    pub fn recover(&self, phrase: &str) -> SecretsResult<EncryptionManager> {
        EncryptionManager::from_recovery_phrase(phrase)
            .map_err(|e| SecretsError::InvalidRecoveryPhrase(e.to_string()))
    }

    /// Generate a replacement key pair.
    ///
    /// Existing data is not re-encrypted and the new key is not saved. The
    /// caller must re-encrypt every affected record under the new manager
    /// before passing it to [`EncryptionService::save_manager`].
    pub fn rotate_key(&self) -> SecretsResult<(EncryptionManager, String)> {
        let (manager, phrase) = EncryptionManager::generate()?;
        tracing::info!(
            fingerprint = %manager.master_key().fingerprint(),
            "generated rotation key (not persisted)"
        );
        Ok((manager, phrase))
    }

    /// Remove the persisted key and forget the cached manager.
    ///
    /// Data encrypted under the removed key is unrecoverable without its
    /// recovery phrase.
    pub fn delete_key(&self) -> SecretsResult<()> {
        let mut cached = self.cache();
        self.storage.delete_key()?;
        cached.take();
        tracing::warn!(
            path = %self.storage.key_path().display(),
            "master key deleted; data encrypted under it needs the recovery phrase"
        );
        Ok(())
    }

    pub fn recovery_phrase(&self) -> SecretsResult<String> {
        Ok(self.manager()?.recovery_phrase()?)
    }

    /// False when no key is loadable; never an error.
    pub fn verify_recovery_phrase(&self, phrase: &str) -> bool {
        match self.manager() {
            Ok(manager) => manager.verify_recovery_phrase(phrase),
            Err(_) => false,
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> SecretsResult<EncryptedData> {
        Ok(self.manager()?.encrypt(plaintext)?)
    }

    pub fn decrypt(&self, envelope: &EncryptedData) -> SecretsResult<String> {
        Ok(self.manager()?.decrypt(envelope)?)
    }

    pub fn encrypt_dict(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> SecretsResult<BTreeMap<String, EncryptedData>> {
        Ok(self.manager()?.encrypt_dict(fields)?)
    }

    pub fn decrypt_dict(
        &self,
        fields: &BTreeMap<String, EncryptedData>,
    ) -> SecretsResult<BTreeMap<String, String>> {
        Ok(self.manager()?.decrypt_dict(fields)?)
    }

    /// Reserved for server-side key escrow.
    pub fn backup_to_server(&self) -> SecretsResult<()> {
        Err(SecretsError::NotImplemented("server key backup"))
    }

    /// Reserved for server-side key escrow.
    pub fn restore_from_server(&self) -> SecretsResult<EncryptionManager> {
        Err(SecretsError::NotImplemented("server key restore"))
    }
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key_path", &self.storage.key_path())
            .field("loaded", &self.cache().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn service_in(dir: &std::path::Path) -> EncryptionService {
        EncryptionService::new(KeyStorage::new(dir))
    }

    #[test]
    fn test_setup_does_not_persist() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());

        let (_manager, phrase) = service.setup().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);
        assert!(!service.storage().has_key());
        assert!(!service.is_enabled());
    }

    #[test]
    fn test_save_manager_enables() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());

        let (manager, phrase) = service.setup().unwrap();
        service.save_manager(manager).unwrap();

        assert!(service.is_enabled());
        assert_eq!(service.recovery_phrase().unwrap(), phrase);
        assert!(service.verify_recovery_phrase(&phrase));
    }

    #[test]
    fn test_no_key_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());

        assert!(matches!(service.encrypt("x"), Err(SecretsError::KeyNotFound(_))));
        assert!(matches!(
            service.recovery_phrase(),
            Err(SecretsError::KeyNotFound(_))
        ));
        assert!(!service.verify_recovery_phrase("anything at all"));
    }

    #[test]
    fn test_status_without_key() {
        let tmp = tempfile::tempdir().unwrap();
        let status = service_in(tmp.path()).status();

        assert_eq!(
            status,
            EncryptionStatus {
                enabled: false,
                key_file_exists: false,
                key_file_path: None,
                key_valid: false,
                error: None,
            }
        );
    }

    #[test]
    fn test_status_with_corrupt_key() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());
        fs::write(service.storage().key_path(), "not-base64!!").unwrap();

        let status = service.status();
        assert!(status.key_file_exists);
        assert_eq!(status.key_file_path.as_deref(), Some(service.storage().key_path()));
        assert!(!status.key_valid);
        assert!(!status.enabled);
        assert!(status.error.is_some());
        assert!(!service.is_enabled());
    }

    #[test]
    fn test_status_with_wrong_length_key() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());
        // valid base64, 16 bytes
        fs::write(service.storage().key_path(), "AAAAAAAAAAAAAAAAAAAAAA==").unwrap();

        let status = service.status();
        assert!(!status.key_valid);
        assert!(status.error.unwrap().contains("32"));
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let tmp = tempfile::tempdir().unwrap();
        let json = serde_json::to_value(service_in(tmp.path()).status()).unwrap();
        assert_eq!(json["keyFileExists"], false);
        assert!(json["keyFilePath"].is_null());
    }

    #[test]
    fn test_delete_key_returns_to_no_key() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());
        let (manager, _) = service.setup().unwrap();
        service.save_manager(manager).unwrap();

        service.delete_key().unwrap();

        assert!(!service.is_enabled());
        assert!(matches!(service.encrypt("x"), Err(SecretsError::KeyNotFound(_))));
    }

    #[test]
    fn test_recover_wraps_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());

        let err = service.recover("definitely not a phrase").unwrap_err();
        assert!(matches!(err, SecretsError::InvalidRecoveryPhrase(_)));
    }

    #[test]
    fn test_recover_then_save_restores_access() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());
        let (manager, phrase) = service.setup().unwrap();
        service.save_manager(manager).unwrap();
        let envelope = service.encrypt("Buy milk").unwrap();

        service.delete_key().unwrap();
        let recovered = service.recover(&phrase).unwrap();
        service.save_manager(recovered).unwrap();

        assert_eq!(service.decrypt(&envelope).unwrap(), "Buy milk");
    }

    #[test]
    fn test_rotate_key_is_not_persisted() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());
        let (manager, phrase) = service.setup().unwrap();
        service.save_manager(manager).unwrap();

        let (rotated, rotated_phrase) = service.rotate_key().unwrap();
        assert_ne!(rotated_phrase, phrase);
        assert_eq!(service.recovery_phrase().unwrap(), phrase);
        assert!(service.reload().unwrap().verify_recovery_phrase(&phrase));
        drop(rotated);
    }

    #[test]
    fn test_cache_survives_until_invalidated() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());
        let (manager, _) = service.setup().unwrap();
        service.save_manager(manager).unwrap();
        let first = service.manager().unwrap();

        // a different key written behind the service's back
        let (other, _) = EncryptionManager::generate().unwrap();
        service.storage().save_key(&other.export_key()).unwrap();

        assert_eq!(service.manager().unwrap().master_key(), first.master_key());
        service.invalidate();
        assert_eq!(service.manager().unwrap().master_key(), other.master_key());
    }

    #[test]
    fn test_dict_passthrough() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());
        let (manager, _) = service.setup().unwrap();
        service.save_manager(manager).unwrap();

        let fields = BTreeMap::from([
            ("content".to_string(), "Call the dentist".to_string()),
            ("description".to_string(), "before Friday".to_string()),
        ]);
        let encrypted = service.encrypt_dict(&fields).unwrap();
        assert_eq!(service.decrypt_dict(&encrypted).unwrap(), fields);
    }

    #[test]
    fn test_server_escrow_not_implemented() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());

        assert!(matches!(
            service.backup_to_server(),
            Err(SecretsError::NotImplemented(_))
        ));
        assert!(matches!(
            service.restore_from_server(),
            Err(SecretsError::NotImplemented(_))
        ));
    }
}
