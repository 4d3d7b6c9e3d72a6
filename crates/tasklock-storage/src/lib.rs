//! tasklock-storage: how sensitive task text reaches the database
//!
//! Every sensitive field has a plain column and a nullable shadow column
//! holding a JSON [`EncryptedData`](tasklock_crypto::EncryptedData) envelope.
//! With encryption on, the plain column is written empty and the shadow column
//! carries the ciphertext. With it off, the shadow column is left `None`.
//!
//! Rows written before encryption was turned on have an empty shadow column
//! and are read back from the plain column unchanged.

pub mod encryptor;
pub mod error;
pub mod field;

pub use encryptor::FieldEncryptor;
pub use error::FieldError;
pub use field::{FieldCrypto, StoredTaskText};
