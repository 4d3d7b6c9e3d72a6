//! Key derivation: PBKDF2-HMAC-SHA256 password → master key

use hmac::Hmac;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::MasterKey;
use crate::{KEY_SIZE, SALT_SIZE};

/// PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derive a 256-bit master key from a password and salt using PBKDF2-HMAC-SHA256.
///
/// The salt must be at least 16 bytes. It does not need to be secret and
/// should be stored next to whatever the key protects.
pub fn derive_master_key(password: &SecretString, salt: &[u8]) -> CryptoResult<MasterKey> {
    if salt.len() < SALT_SIZE {
        return Err(CryptoError::KeyDerivation(format!(
            "salt must be at least {SALT_SIZE} bytes, got {}",
            salt.len()
        )));
    }

    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(
        password.expose_secret().as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        &mut key,
    )
    .map_err(|e| CryptoError::KeyDerivation(format!("PBKDF2 failed: {e}")))?;

    let master = MasterKey::from(key);
    key.zeroize();
    Ok(master)
}

/// Generate a random salt for [`derive_master_key`].
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
