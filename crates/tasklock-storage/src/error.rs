use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("failed to encrypt field: {0}")]
    Encrypt(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Deliberately carries no cause.
    #[error("failed to decrypt field")]
    Decrypt,

    #[error("failed to serialize envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}
