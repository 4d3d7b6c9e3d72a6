//! AES-256-GCM field encryption/decryption
//!
//! Each call to [`encrypt`] draws a fresh random 96-bit IV and produces a
//! self-contained [`EncryptedData`] envelope. No associated data is bound.
//!
//! Wire format (JSON):
//! ```text
//! { "ciphertext": b64, "iv": b64(12 bytes), "authTag": b64(16 bytes), "version": "1" }
//! ```
//! `auth_tag` is accepted as an alias for `authTag` on read.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult, DecryptionCause};
use crate::keys::MasterKey;
use crate::{ENVELOPE_VERSION, IV_SIZE, TAG_SIZE};

/// Ciphertext envelope for one encrypted text value. All binary fields are
/// standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    pub ciphertext: String,
    pub iv: String,
    #[serde(rename = "authTag", alias = "auth_tag")]
    pub auth_tag: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    ENVELOPE_VERSION.to_string()
}

impl EncryptedData {
    /// Serialize to the wire format (always emits `authTag`).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the wire format. Malformed input is a decryption failure.
    pub fn from_json(s: &str) -> CryptoResult<Self> {
        serde_json::from_str(s).map_err(|e| DecryptionCause::Envelope(e).into())
    }
}

/// Encrypt UTF-8 text under `key` with AES-256-GCM and a fresh random IV.
pub fn encrypt(plaintext: &str, key: &MasterKey) -> CryptoResult<EncryptedData> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let mut sealed = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("AES-256-GCM: {e}")))?;

    // aes-gcm output: ciphertext || tag
    let auth_tag = sealed.split_off(sealed.len() - TAG_SIZE);

    Ok(EncryptedData {
        ciphertext: B64.encode(&sealed),
        iv: B64.encode(iv),
        auth_tag: B64.encode(&auth_tag),
        version: ENVELOPE_VERSION.to_string(),
    })
}

/// Verify and decrypt an envelope.
///
/// IV and tag lengths are checked before any AEAD work. Every failure is
/// reported as [`CryptoError::Decryption`]; unverified plaintext is never
/// returned.
pub fn decrypt(envelope: &EncryptedData, key: &MasterKey) -> CryptoResult<String> {
    let ciphertext = decode_field("ciphertext", &envelope.ciphertext)?;
    let iv = decode_field("iv", &envelope.iv)?;
    let auth_tag = decode_field("authTag", &envelope.auth_tag)?;

    if iv.len() != IV_SIZE {
        return Err(DecryptionCause::IvLength {
            expected: IV_SIZE,
            actual: iv.len(),
        }
        .into());
    }
    if auth_tag.len() != TAG_SIZE {
        return Err(DecryptionCause::TagLength {
            expected: TAG_SIZE,
            actual: auth_tag.len(),
        }
        .into());
    }

    let mut sealed = ciphertext;
    sealed.extend_from_slice(&auth_tag);

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), sealed.as_ref())
        .map_err(|_| DecryptionCause::Authentication)?;

    String::from_utf8(plaintext).map_err(|e| DecryptionCause::Utf8(e).into())
}

fn decode_field(field: &'static str, value: &str) -> CryptoResult<Vec<u8>> {
    B64.decode(value)
        .map_err(|error| DecryptionCause::Base64 { field, error }.into())
}
