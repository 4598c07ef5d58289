//! Symmetric per-field encryption and hashing.
//!
//! Every protected column carries its own short random key, stored alongside
//! the ciphertext as `"{ciphertext}${key}"` — leaking one row's key exposes
//! only that row.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::Rng;
use sha2::{Digest, Sha256};

use super::CryptoError;

const NONCE_LEN: usize = 12;

/// Generate a per-record field key (8 hex chars)
pub fn generate_field_key() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 4] = rng.gen();
    hex::encode(bytes)
}

/// Generate a question unique_code: 13 lowercase-alphanumeric chars.
/// Collisions are statistically negligible and not retried.
pub fn generate_unique_code() -> String {
    const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..13)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// One-way SHA-256 hash, hex encoded. Used for password comparison and the
/// user identifier index.
pub fn hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)
}

fn derive_key(key: &str) -> Key<Aes256Gcm> {
    let digest = Sha256::digest(key.as_bytes());
    Key::<Aes256Gcm>::clone_from_slice(&digest)
}

/// Encrypt a field with AES-256-GCM under a key derived from the caller's
/// short key. Output is hex of nonce || ciphertext.
pub fn field_encrypt(plaintext: &str, key: &str) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new(&derive_key(key));
    let nonce_bytes: [u8; NONCE_LEN] = rand::thread_rng().gen();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::FieldEncryptFailed)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(hex::encode(out))
}

/// Decrypt a field produced by [`field_encrypt`]
pub fn field_decrypt(ciphertext_hex: &str, key: &str) -> Result<String, CryptoError> {
    let raw = hex::decode(ciphertext_hex).map_err(|_| CryptoError::FieldDecryptFailed)?;
    if raw.len() < NONCE_LEN {
        return Err(CryptoError::FieldDecryptFailed);
    }

    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(&derive_key(key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::FieldDecryptFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::FieldDecryptFailed)
}

/// Build the stored `"{ciphertext}${key}"` form of a protected field
pub fn protect_field(plaintext: &str, key: &str) -> Result<String, CryptoError> {
    Ok(format!("{}${}", field_encrypt(plaintext, key)?, key))
}

/// Recover the plaintext of a stored `"{ciphertext}${key}"` field
pub fn open_protected(stored: &str) -> Result<String, CryptoError> {
    let (ciphertext, key) = stored
        .split_once('$')
        .ok_or(CryptoError::FieldDecryptFailed)?;
    field_decrypt(ciphertext, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_round_trip() {
        let key = generate_field_key();
        let plaintext = "110101199003074258";
        let ciphertext = field_encrypt(plaintext, &key).unwrap();
        assert_ne!(ciphertext, plaintext);
        assert_eq!(field_decrypt(&ciphertext, &key).unwrap(), plaintext);
    }

    #[test]
    fn test_field_round_trip_empty_string() {
        let key = generate_field_key();
        let ciphertext = field_encrypt("", &key).unwrap();
        assert_eq!(field_decrypt(&ciphertext, &key).unwrap(), "");
    }

    #[test]
    fn test_field_decrypt_wrong_key_fails() {
        let ciphertext = field_encrypt("secret", "key-a").unwrap();
        assert!(field_decrypt(&ciphertext, "key-b").is_err());
    }

    #[test]
    fn test_field_decrypt_garbage_fails() {
        assert!(field_decrypt("not-hex", "key").is_err());
        assert!(field_decrypt("abcd", "key").is_err());
    }

    #[test]
    fn test_protected_field_round_trip() {
        let key = generate_field_key();
        let stored = protect_field("张三", &key).unwrap();
        assert!(stored.contains('$'));
        assert_eq!(open_protected(&stored).unwrap(), "张三");
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash("123456"), hash("123456"));
        assert_ne!(hash("123456"), hash("123457"));
        assert_eq!(hash("123456").len(), 64);
    }

    #[test]
    fn test_generate_unique_code_shape() {
        let code = generate_unique_code();
        assert_eq!(code.len(), 13);
        assert!(code.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(code, generate_unique_code());
    }

    #[test]
    fn test_generate_field_key_shape() {
        let key = generate_field_key();
        assert_eq!(key.len(), 8);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
