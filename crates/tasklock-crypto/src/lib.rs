//! tasklock-crypto: Client-side E2E encryption for task content
//!
//! Envelope format (one per encrypted field):
//! ```text
//! { "ciphertext": b64, "iv": b64(12 bytes), "authTag": b64(16 bytes), "version": "1" }
//! ```
//!
//! Key material:
//! ```text
//! Master Key (256-bit, random or PBKDF2-HMAC-SHA256 from password)
//!   ├── Field AEAD: AES-256-GCM (key=master, nonce=random_96bit, no AAD)
//!   └── Recovery phrase: BIP-39 24 words encoding the raw 32 key bytes
//! ```

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod manager;
pub mod recovery;

pub use cipher::{decrypt, encrypt, EncryptedData};
pub use error::{CryptoError, CryptoResult, DecryptionCause};
pub use kdf::{derive_master_key, generate_salt};
pub use keys::MasterKey;
pub use manager::EncryptionManager;
pub use recovery::RecoveryPhrase;

/// Size of a master key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const IV_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Minimum PBKDF2 salt length
pub const SALT_SIZE: usize = 16;

/// Current envelope format version
pub const ENVELOPE_VERSION: &str = "1";
