//! The seam between the storage layer and whatever holds the key

use std::sync::Arc;

use tasklock_crypto::EncryptedData;
use tasklock_secrets::{EncryptionService, SecretsError};

/// Something that can encrypt and decrypt single text fields.
pub trait FieldEncryptor {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether a usable key is present right now.
    fn is_enabled(&self) -> bool;
    fn encrypt(&self, plaintext: &str) -> Result<EncryptedData, Self::Error>;
    fn decrypt(&self, envelope: &EncryptedData) -> Result<String, Self::Error>;
}

impl FieldEncryptor for EncryptionService {
    type Error = SecretsError;

    fn is_enabled(&self) -> bool {
        EncryptionService::is_enabled(self)
    }
    fn encrypt(&self, plaintext: &str) -> Result<EncryptedData, SecretsError> {
        EncryptionService::encrypt(self, plaintext)
    }
    fn decrypt(&self, envelope: &EncryptedData) -> Result<String, SecretsError> {
        EncryptionService::decrypt(self, envelope)
    }
}

impl<T: FieldEncryptor + ?Sized> FieldEncryptor for Arc<T> {
    type Error = T::Error;

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
    fn encrypt(&self, plaintext: &str) -> Result<EncryptedData, T::Error> {
        (**self).encrypt(plaintext)
    }
    fn decrypt(&self, envelope: &EncryptedData) -> Result<String, T::Error> {
        (**self).decrypt(envelope)
    }
}
