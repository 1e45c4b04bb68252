//! Reconciler Persistence - Test-account ledger, verification log and encryption

pub mod encryption;
pub mod sqlite;

pub use encryption::derive_machine_key;
pub use encryption::{EncryptedSecret, SecretEncryptor};
pub use sqlite::Database;
