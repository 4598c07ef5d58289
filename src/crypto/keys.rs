//! Rotating asymmetric login keys.
//!
//! Clients fetch the current public key, encrypt sensitive login fields with
//! it, and the server decrypts with whichever private key is valid at decrypt
//! time. A client that cached a stale public key across a rotation gets a
//! decrypt failure; that behavior is deliberate and surfaced as-is.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::storage::models::LoginKey;
use crate::storage::Database;

use super::CryptoError;

const KEY_BITS: usize = 2048;

/// Return the most-recently-expiring non-expired login key, generating and
/// persisting a fresh pair when none is valid. Concurrent callers may race to
/// create redundant pairs; last-writer-wins is tolerated.
pub fn valid_key_pair(db: &Database, ttl_seconds: u64) -> Result<LoginKey, CryptoError> {
    let now = Utc::now();
    let newest_valid = db
        .get_all_login_keys()?
        .into_iter()
        .filter(|k| !k.is_expired_at(now))
        .max_by_key(|k| k.expiry_time);

    match newest_valid {
        Some(key) => Ok(key),
        None => generate_key_pair(db, ttl_seconds),
    }
}

fn generate_key_pair(db: &Database, ttl_seconds: u64) -> Result<LoginKey, CryptoError> {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?
        .to_string();

    let key = LoginKey {
        expiry_time: Utc::now() + Duration::seconds(ttl_seconds as i64),
        private_key_pem: pem,
        uuid: uuid::Uuid::new_v4().to_string(),
    };
    db.put_login_key(&key)?;
    tracing::debug!(key_uuid = %key.uuid, expiry = %key.expiry_time, "Generated login key pair");

    Ok(key)
}

/// PEM public half of the currently valid key pair
pub fn public_key_pem(db: &Database, ttl_seconds: u64) -> Result<String, CryptoError> {
    let key = valid_key_pair(db, ttl_seconds)?;
    let private_key = RsaPrivateKey::from_pkcs8_pem(&key.private_key_pem)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))
}

/// Encrypt a plaintext with the current public key (base64 output).
/// Mirrors what the login client does; servers mostly use [`decrypt`].
pub fn encrypt(db: &Database, ttl_seconds: u64, plaintext: &str) -> Result<String, CryptoError> {
    let key = valid_key_pair(db, ttl_seconds)?;
    let private_key = RsaPrivateKey::from_pkcs8_pem(&key.private_key_pem)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);

    let mut rng = rand::thread_rng();
    let ciphertext = public_key
        .encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext.as_bytes())
        .map_err(|e| CryptoError::DecryptFailed(e.to_string()))?;
    Ok(BASE64.encode(ciphertext))
}

/// Decrypt a base64 ciphertext with the private key valid at call time.
/// Does not create keys: a missing/expired key is the caller's error surface.
pub fn decrypt(db: &Database, ciphertext_b64: &str) -> Result<String, CryptoError> {
    let now = Utc::now();
    let key = db
        .get_all_login_keys()?
        .into_iter()
        .filter(|k| !k.is_expired_at(now))
        .max_by_key(|k| k.expiry_time)
        .ok_or(CryptoError::KeyExpiredOrMissing)?;

    let private_key = RsaPrivateKey::from_pkcs8_pem(&key.private_key_pem)
        .map_err(|e| CryptoError::DecryptFailed(e.to_string()))?;

    let raw = BASE64
        .decode(ciphertext_b64)
        .map_err(|e| CryptoError::DecryptFailed(e.to_string()))?;
    let plaintext = private_key
        .decrypt(Oaep::new::<Sha256>(), &raw)
        .map_err(|e| CryptoError::DecryptFailed(e.to_string()))?;

    String::from_utf8(plaintext).map_err(|e| CryptoError::DecryptFailed(e.to_string()))
}

/// Remove every expired login key. Idempotent; run by the background sweep.
pub fn cleanup_expired_login_keys(db: &Database) -> Result<usize, CryptoError> {
    let now = Utc::now();
    let mut cleaned = 0;
    for key in db.get_all_login_keys()? {
        if key.is_expired_at(now) && db.delete_login_key(&key.uuid)? {
            cleaned += 1;
        }
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::setup_db;

    #[test]
    fn test_valid_key_pair_creates_then_reuses() {
        let (db, _temp) = setup_db();

        let first = valid_key_pair(&db, 3600).unwrap();
        let second = valid_key_pair(&db, 3600).unwrap();
        assert_eq!(first.uuid, second.uuid);
        assert_eq!(db.get_all_login_keys().unwrap().len(), 1);
    }

    #[test]
    fn test_latest_non_expired_key_wins() {
        let (db, _temp) = setup_db();

        let old = valid_key_pair(&db, 3600).unwrap();

        // A later-expiring key supersedes the old one without removing it
        let newer = LoginKey {
            expiry_time: Utc::now() + Duration::hours(2),
            private_key_pem: old.private_key_pem.clone(),
            uuid: uuid::Uuid::new_v4().to_string(),
        };
        db.put_login_key(&newer).unwrap();

        let selected = valid_key_pair(&db, 3600).unwrap();
        assert_eq!(selected.uuid, newer.uuid);
        assert_eq!(db.get_all_login_keys().unwrap().len(), 2);
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let (db, _temp) = setup_db();

        let ciphertext = encrypt(&db, 3600, "110101199003074258").unwrap();
        assert_eq!(decrypt(&db, &ciphertext).unwrap(), "110101199003074258");
    }

    #[test]
    fn test_decrypt_without_valid_key_fails() {
        let (db, _temp) = setup_db();

        match decrypt(&db, "whatever") {
            Err(CryptoError::KeyExpiredOrMissing) => {}
            other => panic!("expected KeyExpiredOrMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_decrypt_with_expired_key_only_fails() {
        let (db, _temp) = setup_db();

        let key = valid_key_pair(&db, 3600).unwrap();
        let expired = LoginKey {
            expiry_time: Utc::now() - Duration::hours(1),
            private_key_pem: key.private_key_pem.clone(),
            uuid: key.uuid.clone(),
        };
        db.put_login_key(&expired).unwrap();

        match decrypt(&db, "whatever") {
            Err(CryptoError::KeyExpiredOrMissing) => {}
            other => panic!("expected KeyExpiredOrMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_cleanup_removes_only_expired_keys() {
        let (db, _temp) = setup_db();

        let live = valid_key_pair(&db, 3600).unwrap();
        let expired = LoginKey {
            expiry_time: Utc::now() - Duration::hours(1),
            private_key_pem: live.private_key_pem.clone(),
            uuid: uuid::Uuid::new_v4().to_string(),
        };
        db.put_login_key(&expired).unwrap();

        assert_eq!(cleanup_expired_login_keys(&db).unwrap(), 1);
        let remaining = db.get_all_login_keys().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].uuid, live.uuid);
    }

    #[test]
    fn test_public_key_pem_shape() {
        let (db, _temp) = setup_db();
        let pem = public_key_pem(&db, 3600).unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    }
}
