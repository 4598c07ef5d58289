use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, Envelope};
use crate::crawl::VerifyOutcome;
use crate::crypto;
use crate::tokens::{self, TokenError};
use crate::users;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PublicKeyResponse {
    pub public_key: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// RSA-encrypted, base64
    #[serde(default)]
    pub id_number: Option<String>,
    /// RSA-encrypted, base64
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// "login" for an existing account, "register" for a first visit
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /auth/login — hand out the public half of the current login key pair
pub async fn get_public_key(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<PublicKeyResponse>>, ApiError> {
    let public_key = crypto::public_key_pem(&state.db, state.config.tokens.login_key_ttl_seconds)?;
    Ok(Envelope::success(PublicKeyResponse { public_key }))
}

/// POST /auth/login — log in a known user, or verify against upstream and
/// auto-register on first visit. Both paths end with a fresh token pair.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Envelope<LoginResponse>>, ApiError> {
    let (id_number_enc, password_enc) = match (body.id_number, body.password) {
        (Some(id), Some(pw)) => (id, pw),
        _ => {
            return Err(ApiError::unauthorized(
                "unauthorized",
                "id_number and password are required",
            ))
        }
    };

    let id_number = decrypt_credential(&state, &id_number_enc)?;
    let password = decrypt_credential(&state, &password_enc)?;

    if password.len() != 6 || !password.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::bad_request(
            "password_illegal",
            "password must be 6 digits",
        ));
    }

    if let Some(user) = users::find_by_id_number(&state.db, &id_number)? {
        if !users::check_password(&state.db, &id_number, &password)? {
            return Err(ApiError::unauthorized(
                "password_incorrect",
                "wrong password",
            ));
        }
        let issued = tokens::generate_tokens(&state.db, &state.config.tokens, &user.uuid)?;
        tracing::info!(uuid = %user.uuid, "User logged in");
        return Ok(Envelope::success(LoginResponse {
            kind: "login",
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
        }));
    }

    // First visit: the credential must be recognized by upstream before an
    // account is created for it
    let record = match state.upstream.verify_id_number(&id_number).await? {
        VerifyOutcome::Verified(record) => record,
        VerifyOutcome::Invalid => {
            return Err(ApiError::unauthorized(
                "no_detected",
                "credential not recognized",
            ))
        }
        VerifyOutcome::Unrecognized => {
            return Err(ApiError::internal("upstream returned an unexpected answer"))
        }
    };

    // The profession's crawl record, when configured, tells us the user's
    // main professional subject
    let main_subject = state
        .db
        .get_request_info_by_profession(&record.profession)?
        .map(|info| info.subject);

    let user = users::create_user(
        &state.db,
        &id_number,
        &record.name,
        &password,
        &record.school,
        &record.profession,
        main_subject,
    )?;
    let issued = tokens::generate_tokens(&state.db, &state.config.tokens, &user.uuid)?;
    tracing::info!(uuid = %user.uuid, "User registered on first login");

    Ok(Envelope::success(LoginResponse {
        kind: "register",
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
    }))
}

/// POST /auth/refresh — trade a refresh token for a new pair
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<Envelope<LoginResponse>>, ApiError> {
    let refresh_token = body.refresh_token.ok_or_else(|| {
        ApiError::bad_request("lack_refresh_token", "refresh_token is required")
    })?;

    let issued = match tokens::refresh_tokens(&state.db, &state.config.tokens, &refresh_token) {
        Ok(issued) => issued,
        Err(TokenError::RefreshInvalidOrExpired) => {
            return Err(ApiError::unauthorized(
                "refresh_invalid",
                "refresh token invalid or expired",
            ))
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Envelope::success(LoginResponse {
        kind: "login",
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
    }))
}

/// Login credentials arrive RSA-encrypted; a failure here is a client
/// problem (stale key, mangled payload), not a server fault
fn decrypt_credential(state: &AppState, ciphertext: &str) -> Result<String, ApiError> {
    crypto::decrypt(&state.db, ciphertext).map_err(|e| {
        ApiError::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            format!("credential decryption failed: {e}"),
        )
    })
}
