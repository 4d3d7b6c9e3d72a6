//! EncryptionManager: a master key plus phrase backup and batch field helpers

use std::collections::BTreeMap;

use crate::cipher::{self, EncryptedData};
use crate::error::CryptoResult;
use crate::keys::MasterKey;
use crate::recovery::RecoveryPhrase;

/// Holds one master key and performs every operation that needs it.
///
/// The recovery phrase is never cached; it is re-derived from the key each
/// time it is requested.
#[derive(Debug, Clone)]
pub struct EncryptionManager {
    master_key: MasterKey,
}

impl EncryptionManager {
    pub fn new(master_key: MasterKey) -> Self {
        Self { master_key }
    }

    /// Create a manager around a fresh random key.
    ///
    /// Returns the manager and its 24-word recovery phrase. Nothing is persisted.
    pub fn generate() -> CryptoResult<(Self, String)> {
        let manager = Self::new(MasterKey::generate());
        let phrase = manager.recovery_phrase()?;
        Ok((manager, phrase))
    }

    pub fn from_base64_key(encoded: &str) -> CryptoResult<Self> {
        MasterKey::from_base64(encoded).map(Self::new)
    }

    pub fn from_recovery_phrase(phrase: &str) -> CryptoResult<Self> {
        RecoveryPhrase::from_words(phrase)?
            .to_master_key()
            .map(Self::new)
    }

    pub fn master_key(&self) -> &MasterKey {
        &self.master_key
    }

    /// Derive the 24-word phrase for the current key.
    pub fn recovery_phrase(&self) -> CryptoResult<String> {
        RecoveryPhrase::from_master_key(&self.master_key).map(|p| p.to_string())
    }

    /// Whether `candidate` recovers this manager's key.
    ///
    /// Case and whitespace are normalised. Malformed candidates simply do not
    /// match; this never returns an error.
    pub fn verify_recovery_phrase(&self, candidate: &str) -> bool {
        match Self::from_recovery_phrase(candidate) {
            Ok(other) => other.master_key == self.master_key,
            Err(e) => {
                tracing::debug!("recovery phrase candidate rejected: {e}");
                false
            }
        }
    }

    /// Base64 of the raw key; this is what the key file holds.
    pub fn export_key(&self) -> String {
        self.master_key.to_base64()
    }

    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<EncryptedData> {
        cipher::encrypt(plaintext, &self.master_key)
    }

    pub fn decrypt(&self, envelope: &EncryptedData) -> CryptoResult<String> {
        cipher::decrypt(envelope, &self.master_key)
    }

    /// Encrypt every value of a record, keeping its keys.
    pub fn encrypt_dict(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> CryptoResult<BTreeMap<String, EncryptedData>> {
        fields
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.encrypt(value)?)))
            .collect()
    }

    /// Decrypt every envelope of a record, keeping its keys. Fails on the
    /// first envelope that does not verify.
    pub fn decrypt_dict(
        &self,
        fields: &BTreeMap<String, EncryptedData>,
    ) -> CryptoResult<BTreeMap<String, String>> {
        fields
            .iter()
            .map(|(name, envelope)| Ok((name.clone(), self.decrypt(envelope)?)))
            .collect()
    }
}
