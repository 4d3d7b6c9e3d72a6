pub mod config;
pub mod error;

pub use config::{E2eeConfig, LogConfig, TasklockConfig};
pub use error::{TasklockError, TasklockResult};
