use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(#[from] base64::DecodeError),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Wrong key, tampered bytes and malformed envelopes all report the same
    /// message; the cause is only reachable through `source()`.
    #[error("decryption failed")]
    Decryption {
        #[source]
        source: DecryptionCause,
    },

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("invalid recovery phrase: {0}")]
    InvalidRecoveryPhrase(String),
}

/// Underlying reason for a [`CryptoError::Decryption`]
#[derive(Debug, Error)]
pub enum DecryptionCause {
    #[error("base64 decode of {field}: {error}")]
    Base64 {
        field: &'static str,
        error: base64::DecodeError,
    },

    #[error("IV must be {expected} bytes, got {actual}")]
    IvLength { expected: usize, actual: usize },

    #[error("auth tag must be {expected} bytes, got {actual}")]
    TagLength { expected: usize, actual: usize },

    #[error("authentication failed")]
    Authentication,

    #[error("plaintext is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("malformed envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

impl From<DecryptionCause> for CryptoError {
    fn from(source: DecryptionCause) -> Self {
        CryptoError::Decryption { source }
    }
}
