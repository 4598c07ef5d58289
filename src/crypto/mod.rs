//! Credential protection: rotating login key pairs, per-field symmetric
//! encryption, and one-way hashing.

pub mod fields;
pub mod keys;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Database error: {0}")]
    Database(#[from] crate::storage::DatabaseError),
    #[error("Decrypt failed: {0}")]
    DecryptFailed(String),
    #[error("Field decrypt failed")]
    FieldDecryptFailed,
    #[error("Field encrypt failed")]
    FieldEncryptFailed,
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),
    #[error("Login key expired or missing")]
    KeyExpiredOrMissing,
}

pub use fields::{
    field_decrypt, field_encrypt, generate_field_key, generate_unique_code, hash, open_protected,
    protect_field,
};
pub use keys::{cleanup_expired_login_keys, decrypt, encrypt, public_key_pem, valid_key_pair};
