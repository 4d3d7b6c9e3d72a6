//! Field-level encryption for task content and description

use serde::{Deserialize, Serialize};
use tasklock_core::config::E2eeConfig;
use tasklock_crypto::EncryptedData;

use crate::encryptor::FieldEncryptor;
use crate::error::FieldError;

/// Task text as laid out in the two-column schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTaskText {
    pub content: String,
    pub content_encrypted: Option<String>,
    pub description: String,
    pub description_encrypted: Option<String>,
}

/// Applies field encryption when an enabled encryptor is present, and passes
/// text through untouched otherwise.
#[derive(Debug, Clone)]
pub struct FieldCrypto<S> {
    service: Option<S>,
}

impl<S: FieldEncryptor> FieldCrypto<S> {
    pub fn new(service: Option<S>) -> Self {
        Self { service }
    }

    /// Honour the `[e2ee].enabled` switch: with it off the service is dropped
    /// and a present key is ignored.
    pub fn from_config(config: &E2eeConfig, service: Option<S>) -> Self {
        if !config.enabled && service.is_some() {
            tracing::debug!("e2ee disabled in config; storing task text in plain columns");
        }
        Self::new(service.filter(|_| config.enabled))
    }

    /// Re-evaluated on every call, so deleting or adding the key takes effect
    /// without rebuilding the adapter.
    pub fn is_enabled(&self) -> bool {
        self.enabled_service().is_some()
    }

    fn enabled_service(&self) -> Option<&S> {
        self.service.as_ref().filter(|s| s.is_enabled())
    }

    /// Encrypt `plaintext` to a JSON envelope, or `""` when disabled.
    pub fn encrypt_field(&self, plaintext: &str) -> Result<String, FieldError> {
        match self.enabled_service() {
            Some(service) => seal(service, plaintext),
            None => Ok(String::new()),
        }
    }

    /// Decrypt a JSON envelope, or `""` when disabled.
    ///
    /// Every failure is reported as [`FieldError::Decrypt`].
    pub fn decrypt_field(&self, serialized: &str) -> Result<String, FieldError> {
        match self.enabled_service() {
            Some(service) => open(service, serialized),
            None => Ok(String::new()),
        }
    }

    /// Split task text into plain and shadow columns.
    ///
    /// An absent or empty description gets no shadow value. The enabled
    /// state is sampled once, so a record is either fully plain or fully
    /// encrypted.
    pub fn prepare_for_storage(
        &self,
        content: &str,
        description: Option<&str>,
    ) -> Result<StoredTaskText, FieldError> {
        let Some(service) = self.enabled_service() else {
            return Ok(StoredTaskText {
                content: content.to_string(),
                content_encrypted: None,
                description: description.unwrap_or_default().to_string(),
                description_encrypted: None,
            });
        };

        let description_encrypted = match description {
            Some(d) if !d.is_empty() => Some(seal(service, d)?),
            _ => None,
        };
        Ok(StoredTaskText {
            content: String::new(),
            content_encrypted: Some(seal(service, content)?),
            description: String::new(),
            description_encrypted,
        })
    }

    /// Recover `(content, description)` from the stored columns.
    pub fn extract_from_storage(
        &self,
        plain_content: &str,
        encrypted_content: Option<&str>,
        plain_description: &str,
        encrypted_description: Option<&str>,
    ) -> Result<(String, String), FieldError> {
        let encrypted_content = match encrypted_content {
            Some(c) if !c.is_empty() => c,
            // row written before encryption was turned on
            _ => return Ok((plain_content.to_string(), plain_description.to_string())),
        };
        let Some(service) = self.enabled_service() else {
            return Ok((plain_content.to_string(), plain_description.to_string()));
        };

        let content = open(service, encrypted_content)?;
        let description = match encrypted_description {
            Some(d) if !d.is_empty() => open(service, d)?,
            _ => String::new(),
        };
        Ok((content, description))
    }

    /// [`FieldCrypto::extract_from_storage`] over a whole stored record.
    pub fn extract(&self, stored: &StoredTaskText) -> Result<(String, String), FieldError> {
        self.extract_from_storage(
            &stored.content,
            stored.content_encrypted.as_deref(),
            &stored.description,
            stored.description_encrypted.as_deref(),
        )
    }
}

fn seal<S: FieldEncryptor>(service: &S, plaintext: &str) -> Result<String, FieldError> {
    let envelope = service
        .encrypt(plaintext)
        .map_err(|e| FieldError::Encrypt(Box::new(e)))?;
    Ok(envelope.to_json()?)
}

fn open<S: FieldEncryptor>(service: &S, serialized: &str) -> Result<String, FieldError> {
    let envelope = EncryptedData::from_json(serialized).map_err(|e| {
        tracing::debug!("stored envelope unreadable: {e:?}");
        FieldError::Decrypt
    })?;
    service.decrypt(&envelope).map_err(|e| {
        tracing::debug!("field decryption failed: {e:?}");
        FieldError::Decrypt
    })
}
