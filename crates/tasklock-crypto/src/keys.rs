//! The 256-bit master key and its encodings

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use rand::RngCore;
use secrecy::SecretString;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::KEY_SIZE;

/// A 256-bit symmetric master key.
///
/// Zeroized on drop. `Debug` shows only a truncated SHA-256 fingerprint and
/// equality compares SHA-256 digests rather than the raw bytes.
#[derive(Clone)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    /// Generate a fresh random key from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Derive a key from a password via PBKDF2-HMAC-SHA256 (100k iterations).
    pub fn from_password(password: &SecretString, salt: &[u8]) -> CryptoResult<Self> {
        crate::kdf::derive_master_key(password, salt)
    }

    /// Build a key from raw bytes; anything other than 32 bytes is rejected.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self { bytes: array })
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let mut decoded = B64.decode(encoded.trim())?;
        let key = Self::from_bytes(&decoded);
        decoded.zeroize();
        key
    }

    /// Standard base64 of the raw key; the only persisted form.
    pub fn to_base64(&self) -> String {
        B64.encode(self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// First 16 hex chars of SHA-256(key), safe for logs.
    pub fn fingerprint(&self) -> String {
        Sha256::digest(self.bytes)
            .iter()
            .take(8)
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

impl From<[u8; KEY_SIZE]> for MasterKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }
}

impl PartialEq for MasterKey {
    fn eq(&self, other: &Self) -> bool {
        Sha256::digest(self.bytes) == Sha256::digest(other.bytes)
    }
}

impl Eq for MasterKey {}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MasterKey(key_hash={}...)", self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random() {
        let k1 = MasterKey::generate();
        let k2 = MasterKey::generate();
        assert_ne!(k1, k2, "random keys must differ");
        assert_eq!(k1.as_bytes().len(), KEY_SIZE);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        for len in [0usize, 1, 16, 31, 33, 64] {
            let result = MasterKey::from_bytes(&vec![7u8; len]);
            assert!(
                matches!(result, Err(CryptoError::InvalidKeyLength { expected: 32, actual }) if actual == len),
                "length {len} must be rejected"
            );
        }
        assert!(MasterKey::from_bytes(&[7u8; 32]).is_ok());
    }

    #[test]
    fn test_base64_roundtrip() {
        let key = MasterKey::generate();
        let encoded = key.to_base64();
        let decoded = MasterKey::from_base64(&encoded).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn test_from_base64_tolerates_trailing_newline() {
        let key = MasterKey::from([9u8; KEY_SIZE]);
        let decoded = MasterKey::from_base64(&format!("{}\n", key.to_base64())).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn test_from_base64_wrong_length() {
        let short = B64.encode([1u8; 16]);
        assert!(matches!(
            MasterKey::from_base64(&short),
            Err(CryptoError::InvalidKeyLength { actual: 16, .. })
        ));
    }

    #[test]
    fn test_from_base64_invalid_encoding() {
        assert!(matches!(
            MasterKey::from_base64("not base64!!"),
            Err(CryptoError::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let key = MasterKey::from([0xABu8; KEY_SIZE]);
        let debug = format!("{key:?}");

        assert!(debug.starts_with("MasterKey(key_hash="));
        assert!(debug.contains(&key.fingerprint()));
        assert!(!debug.contains(&key.to_base64()));
    }

    #[test]
    fn test_fingerprint_is_stable_and_truncated() {
        let key = MasterKey::from([1u8; KEY_SIZE]);
        assert_eq!(key.fingerprint(), key.clone().fingerprint());
        assert_eq!(key.fingerprint().len(), 16);
    }

    #[test]
    fn test_equality() {
        let a = MasterKey::from([3u8; KEY_SIZE]);
        let b = MasterKey::from_bytes(&[3u8; KEY_SIZE]).unwrap();
        let c = MasterKey::from([4u8; KEY_SIZE]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
