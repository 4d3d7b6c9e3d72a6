use std::path::PathBuf;

use tasklock_crypto::CryptoError;
use thiserror::Error;

pub type SecretsResult<T> = Result<T, SecretsError>;

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("no encryption key found at {0}; run `tasklock encryption setup` first")]
    KeyNotFound(PathBuf),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("invalid recovery phrase: {0}")]
    InvalidRecoveryPhrase(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
