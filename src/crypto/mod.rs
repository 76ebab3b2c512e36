//! Cryptographic utilities for the document vault

pub mod file;
pub mod vault;

pub use file::{seal_file, unseal_file};
pub use vault::{
    open, open_json, open_with_password, seal, seal_json, seal_with_password, EncryptionError,
    EncryptionKey, SealedPayload,
};
