use thiserror::Error;

pub type TasklockResult<T> = Result<T, TasklockError>;

#[derive(Debug, Error)]
pub enum TasklockError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
