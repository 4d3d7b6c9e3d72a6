//! tasklock-secrets: master-key persistence and the encryption service
//!
//! Key directory discovery chain (in order of precedence):
//!   1. $TASKLOCK_KEY_DIR
//!   2. `[e2ee].key_dir` from tasklock.toml
//!   3. <platform config dir>/tasklock  (e.g. ~/.config/tasklock)

pub mod error;
pub mod key_store;
pub mod service;

pub use error::{SecretsError, SecretsResult};
pub use key_store::KeyStorage;
pub use service::{EncryptionService, EncryptionStatus};

use std::path::PathBuf;

use tasklock_core::config::{default_config_dir, expand_tilde, E2eeConfig};

/// Environment override for the key directory
pub const KEY_DIR_ENV: &str = "TASKLOCK_KEY_DIR";

/// Resolve the directory holding the master key file.
pub fn resolve_key_dir(config: &E2eeConfig) -> PathBuf {
    if let Ok(dir) = std::env::var(KEY_DIR_ENV) {
        if !dir.is_empty() {
            return expand_tilde(&PathBuf::from(dir));
        }
    }
    if let Some(dir) = &config.key_dir {
        return expand_tilde(dir);
    }
    default_config_dir()
}

/// Build the key storage described by `config`.
pub fn key_storage_from_config(config: &E2eeConfig) -> KeyStorage {
    KeyStorage::with_file_name(resolve_key_dir(config), &config.key_file)
}
