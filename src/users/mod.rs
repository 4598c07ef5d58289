//! User registration and credential checks.
//!
//! Sensitive columns never hit the store in plaintext: id_number and name are
//! field-encrypted with a per-record key, the password is hashed, and lookups
//! go through a hash of the credential (the identifier index).

use chrono::Utc;
use thiserror::Error;

use crate::crypto;
use crate::storage::models::User;
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("User does not exist")]
    NotFound,
    #[error("A user already exists for this credential")]
    AlreadyExists,
}

/// Register a user. `main_subject` comes from the profession's RequestInfo
/// row when known; an unconfigured profession gets subject 0.
pub fn create_user(
    db: &Database,
    id_number: &str,
    name: &str,
    password: &str,
    school: &str,
    profession: &str,
    main_subject: Option<i32>,
) -> Result<User, UserError> {
    // One account per credential; the identifier index is the source of truth
    if db.get_user_by_identifier(&crypto::hash(id_number))?.is_some() {
        return Err(UserError::AlreadyExists);
    }

    let now = Utc::now();
    let key = crypto::generate_field_key();

    let user = User {
        identifier: crypto::hash(id_number),
        id_number: crypto::protect_field(id_number, &key)?,
        last_login: now,
        name: crypto::protect_field(name, &key)?,
        password: crypto::hash(password),
        permission: 0,
        profession: profession.to_string(),
        profession_main_subject: main_subject.unwrap_or(0),
        reg_date: now,
        school: school.to_string(),
        uuid: uuid::Uuid::new_v4().to_string(),
    };

    db.put_user(&user)?;
    tracing::debug!(uuid = %user.uuid, "Registered user");
    Ok(user)
}

/// Find a user by plaintext credential, via the identifier index
pub fn find_by_id_number(db: &Database, id_number: &str) -> Result<Option<User>, UserError> {
    Ok(db.get_user_by_identifier(&crypto::hash(id_number))?)
}

/// Hash-compare a login password. False when the user does not exist.
pub fn check_password(db: &Database, id_number: &str, password: &str) -> Result<bool, UserError> {
    match find_by_id_number(db, id_number)? {
        Some(user) => Ok(user.password == crypto::hash(password)),
        None => Ok(false),
    }
}

pub fn find_by_uuid(db: &Database, uuid: &str) -> Result<Option<User>, UserError> {
    Ok(db.get_user(uuid)?)
}

pub fn touch_last_login(db: &Database, uuid: &str) -> Result<(), UserError> {
    let mut user = db.get_user(uuid)?.ok_or(UserError::NotFound)?;
    user.last_login = Utc::now();
    db.put_user(&user)?;
    Ok(())
}

pub fn update_permission(db: &Database, uuid: &str, permission: i32) -> Result<User, UserError> {
    let mut user = db.get_user(uuid)?.ok_or(UserError::NotFound)?;
    user.permission = permission;
    db.put_user(&user)?;
    Ok(user)
}

/// True when the user's access level meets the threshold
pub fn check_permission(db: &Database, uuid: &str, required: i32) -> Result<bool, UserError> {
    let user = db.get_user(uuid)?.ok_or(UserError::NotFound)?;
    Ok(user.permission >= required)
}
