//! Token pair issuance, validation, refresh, and cleanup.
//!
//! One live pair per user: issuing (or refreshing) overwrites whatever pair
//! the user held before, which also invalidates the old access token via the
//! `not_exist` path.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::TokenConfig;
use crate::crypto;
use crate::storage::models::TokenPair;
use crate::storage::{Database, DatabaseError};
use crate::users;

use super::claims::{self, AccessClaims};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Refresh token invalid or expired")]
    RefreshInvalidOrExpired,
    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("Token does not exist")]
    NotExist,
    #[error("Token expired")]
    Expired,
    #[error("Token invalid")]
    Invalid,
    #[error("User does not exist")]
    UserMissing,
}

/// A freshly issued access/refresh pair, as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Decrypted user projection attached to validated requests
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id_number: String,
    pub last_login: DateTime<Utc>,
    pub name: String,
    pub permission: i32,
    pub profession: String,
    pub profession_main_subject: i32,
    pub reg_date: DateTime<Utc>,
    pub school: String,
    pub uuid: String,
}

/// Discriminated outcome of an access-token check. Expected failures are
/// values, not errors.
#[derive(Debug)]
pub enum TokenValidation {
    Valid(UserProfile),
    NotExist,
    Expired,
    Invalid,
}

/// Issue a token pair for a user, replacing any prior pair
pub fn generate_tokens(
    db: &Database,
    config: &TokenConfig,
    user_uuid: &str,
) -> Result<IssuedTokens, TokenError> {
    let user = db.get_user(user_uuid)?.ok_or(TokenError::UserMissing)?;

    let now = Utc::now();
    let access_expiry = (now + Duration::seconds(config.access_ttl_seconds as i64))
        .timestamp_millis();
    let refresh_expiry = (now + Duration::seconds(config.refresh_ttl_seconds as i64))
        .timestamp_millis();

    let access_token = claims::sign(
        &AccessClaims {
            exp: access_expiry,
            permission: user.permission,
            uuid: user_uuid.to_string(),
        },
        &config.secret,
    )?;
    let refresh_token = uuid::Uuid::new_v4().to_string();

    let pair = TokenPair {
        access_token: access_token.clone(),
        access_token_expiry: access_expiry,
        refresh_token: refresh_token.clone(),
        refresh_token_expiry: refresh_expiry,
        uuid: user_uuid.to_string(),
    };
    db.put_token_pair(&pair)?;
    tracing::debug!(uuid = %user_uuid, "Issued token pair");

    Ok(IssuedTokens {
        access_token,
        refresh_token,
    })
}

/// Three-stage access-token check: stored record exists, stored expiry not
/// passed, signature verifies. On success the user row is resolved
/// (protected fields decrypted) and last_login touched.
pub fn validate_access_token(
    db: &Database,
    config: &TokenConfig,
    access_token: &str,
) -> Result<TokenValidation, TokenError> {
    let pair = match db.get_token_pair_by_access(access_token)? {
        Some(pair) => pair,
        None => return Ok(TokenValidation::NotExist),
    };

    if Utc::now().timestamp_millis() > pair.access_token_expiry {
        return Ok(TokenValidation::Expired);
    }

    let claims = match claims::verify(access_token, &config.secret) {
        Ok(claims) => claims,
        Err(_) => return Ok(TokenValidation::Invalid),
    };

    let user = match db.get_user(&claims.uuid)? {
        Some(user) => user,
        None => return Ok(TokenValidation::NotExist),
    };

    let id_number = match crypto::open_protected(&user.id_number) {
        Ok(v) => v,
        Err(_) => return Ok(TokenValidation::Invalid),
    };
    let name = match crypto::open_protected(&user.name) {
        Ok(v) => v,
        Err(_) => return Ok(TokenValidation::Invalid),
    };

    users::touch_last_login(db, &user.uuid).map_err(|_| TokenError::UserMissing)?;

    Ok(TokenValidation::Valid(UserProfile {
        id_number,
        last_login: user.last_login,
        name,
        permission: user.permission,
        profession: user.profession,
        profession_main_subject: user.profession_main_subject,
        reg_date: user.reg_date,
        school: user.school,
        uuid: user.uuid,
    }))
}

/// Exchange a refresh token for a fresh pair (old pair overwritten)
pub fn refresh_tokens(
    db: &Database,
    config: &TokenConfig,
    refresh_token: &str,
) -> Result<IssuedTokens, TokenError> {
    let pair = db
        .get_token_pair_by_refresh(refresh_token)?
        .ok_or(TokenError::RefreshInvalidOrExpired)?;

    if Utc::now().timestamp_millis() > pair.refresh_token_expiry {
        return Err(TokenError::RefreshInvalidOrExpired);
    }

    generate_tokens(db, config, &pair.uuid)
}

/// Decode the permission claim without touching the user row.
/// Used purely for authorization gating.
pub fn permission_from_token(
    db: &Database,
    config: &TokenConfig,
    access_token: &str,
) -> Result<i32, TokenError> {
    let pair = db
        .get_token_pair_by_access(access_token)?
        .ok_or(TokenError::NotExist)?;

    if Utc::now().timestamp_millis() > pair.access_token_expiry {
        return Err(TokenError::Expired);
    }

    let claims = claims::verify(access_token, &config.secret).map_err(|_| TokenError::Invalid)?;
    Ok(claims.permission)
}

/// Remove every pair whose access or refresh expiry has passed.
/// Idempotent; safe to run repeatedly.
pub fn cleanup_expired_tokens(db: &Database) -> Result<usize, TokenError> {
    let now = Utc::now().timestamp_millis();
    let mut cleaned = 0;

    for pair in db.get_all_token_pairs()? {
        if pair.is_expired_at(now) && db.delete_token_pair(&pair.uuid)? {
            cleaned += 1;
        }
    }

    if cleaned > 0 {
        tracing::info!(count = cleaned, "Cleaned up expired token pairs");
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{register_user, setup_db, test_token_config};

    #[test]
    fn test_generate_and_validate() {
        let (db, _temp) = setup_db();
        let config = test_token_config();
        let user = register_user(&db, "110101199003074258", "张三");

        let tokens = generate_tokens(&db, &config, &user.uuid).unwrap();

        match validate_access_token(&db, &config, &tokens.access_token).unwrap() {
            TokenValidation::Valid(profile) => {
                assert_eq!(profile.uuid, user.uuid);
                assert_eq!(profile.id_number, "110101199003074258");
                assert_eq!(profile.name, "张三");
            }
            other => panic!("expected Valid, got {other:?}"),
        }
    }

    #[test]
    fn test_generate_for_missing_user_fails() {
        let (db, _temp) = setup_db();
        assert!(matches!(
            generate_tokens(&db, &test_token_config(), "no-such-uuid"),
            Err(TokenError::UserMissing)
        ));
    }

    #[test]
    fn test_unknown_token_not_exist() {
        let (db, _temp) = setup_db();
        let result = validate_access_token(&db, &test_token_config(), "bogus").unwrap();
        assert!(matches!(result, TokenValidation::NotExist));
    }

    #[test]
    fn test_expired_access_token() {
        let (db, _temp) = setup_db();
        let config = test_token_config();
        let user = register_user(&db, "110101199003074258", "张三");
        let tokens = generate_tokens(&db, &config, &user.uuid).unwrap();

        // Backdate the stored access expiry; stage (b) must fire before the
        // signature check
        let mut pair = db.get_token_pair(&user.uuid).unwrap().unwrap();
        pair.access_token_expiry = Utc::now().timestamp_millis() - 1000;
        db.put_token_pair(&pair).unwrap();

        let result = validate_access_token(&db, &config, &tokens.access_token).unwrap();
        assert!(matches!(result, TokenValidation::Expired));
    }

    #[test]
    fn test_refresh_replaces_pair() {
        let (db, _temp) = setup_db();
        let config = test_token_config();
        let user = register_user(&db, "110101199003074258", "张三");

        let first = generate_tokens(&db, &config, &user.uuid).unwrap();
        let second = refresh_tokens(&db, &config, &first.refresh_token).unwrap();
        assert_ne!(first.access_token, second.access_token);

        // Only one pair is retained, so the old access token no longer exists
        let result = validate_access_token(&db, &config, &first.access_token).unwrap();
        assert!(matches!(result, TokenValidation::NotExist));

        match validate_access_token(&db, &config, &second.access_token).unwrap() {
            TokenValidation::Valid(profile) => assert_eq!(profile.uuid, user.uuid),
            other => panic!("expected Valid, got {other:?}"),
        }
    }

    #[test]
    fn test_refresh_with_unknown_token_fails() {
        let (db, _temp) = setup_db();
        assert!(matches!(
            refresh_tokens(&db, &test_token_config(), "bogus"),
            Err(TokenError::RefreshInvalidOrExpired)
        ));
    }

    #[test]
    fn test_refresh_past_expiry_fails() {
        let (db, _temp) = setup_db();
        let config = test_token_config();
        let user = register_user(&db, "110101199003074258", "张三");
        let tokens = generate_tokens(&db, &config, &user.uuid).unwrap();

        let mut pair = db.get_token_pair(&user.uuid).unwrap().unwrap();
        pair.refresh_token_expiry = Utc::now().timestamp_millis() - 1000;
        db.put_token_pair(&pair).unwrap();

        assert!(matches!(
            refresh_tokens(&db, &config, &tokens.refresh_token),
            Err(TokenError::RefreshInvalidOrExpired)
        ));
    }

    #[test]
    fn test_permission_claim() {
        let (db, _temp) = setup_db();
        let config = test_token_config();
        let user = register_user(&db, "110101199003074258", "张三");
        crate::users::update_permission(&db, &user.uuid, 10).unwrap();

        let tokens = generate_tokens(&db, &config, &user.uuid).unwrap();
        assert_eq!(
            permission_from_token(&db, &config, &tokens.access_token).unwrap(),
            10
        );
    }

    #[test]
    fn test_cleanup_expired_tokens_idempotent() {
        let (db, _temp) = setup_db();
        let config = test_token_config();

        let alive = register_user(&db, "110101199003074258", "甲");
        let stale = register_user(&db, "110101199003074259", "乙");
        generate_tokens(&db, &config, &alive.uuid).unwrap();
        generate_tokens(&db, &config, &stale.uuid).unwrap();

        let mut pair = db.get_token_pair(&stale.uuid).unwrap().unwrap();
        pair.refresh_token_expiry = Utc::now().timestamp_millis() - 1000;
        db.put_token_pair(&pair).unwrap();

        assert_eq!(cleanup_expired_tokens(&db).unwrap(), 1);
        assert_eq!(cleanup_expired_tokens(&db).unwrap(), 0);
        assert!(db.get_token_pair(&alive.uuid).unwrap().is_some());
        assert!(db.get_token_pair(&stale.uuid).unwrap().is_none());
    }
}
