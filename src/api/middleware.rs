//! Access-token guard middleware
//!
//! Applied to the user routes. Resolves the bearer token to a full user
//! profile and stashes it in request extensions; failures come back as
//! HTTP 200 error envelopes so clients branch on the envelope code.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::tokens::{self, TokenValidation};
use crate::AppState;

pub async fn token_guard(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => {
            return ApiError::soft(StatusCode::UNAUTHORIZED, "lack_token", "missing access token")
                .into_response();
        }
    };

    let validation = match tokens::validate_access_token(&state.db, &state.config.tokens, &token) {
        Ok(validation) => validation,
        Err(e) => {
            tracing::error!(error = %e, "Token validation failed");
            return ApiError::soft(
                StatusCode::INTERNAL_SERVER_ERROR,
                "unexpected_error",
                e.to_string(),
            )
            .into_response();
        }
    };

    match validation {
        TokenValidation::Valid(profile) => {
            request.extensions_mut().insert(profile);
            next.run(request).await
        }
        TokenValidation::Expired => {
            ApiError::soft(StatusCode::UNAUTHORIZED, "expiry_token", "access token expired")
                .into_response()
        }
        TokenValidation::NotExist => ApiError::soft(
            StatusCode::UNAUTHORIZED,
            "token_not_exist",
            "access token not recognized",
        )
        .into_response(),
        // A token that is on record but fails signature decoding is not a
        // client state the reason set covers
        TokenValidation::Invalid => ApiError::soft(
            StatusCode::INTERNAL_SERVER_ERROR,
            "unexpected_error",
            "access token could not be decoded",
        )
        .into_response(),
    }
}

/// Admin routes only need the permission claim, not a resolved profile;
/// the claim is decoded without touching the user row.
pub async fn admin_guard(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => {
            return ApiError::soft(StatusCode::UNAUTHORIZED, "lack_token", "missing access token")
                .into_response();
        }
    };

    let permission =
        match tokens::permission_from_token(&state.db, &state.config.tokens, &token) {
            Ok(permission) => permission,
            Err(tokens::TokenError::Expired) => {
                return ApiError::soft(
                    StatusCode::UNAUTHORIZED,
                    "expiry_token",
                    "access token expired",
                )
                .into_response();
            }
            Err(tokens::TokenError::NotExist) => {
                return ApiError::soft(
                    StatusCode::UNAUTHORIZED,
                    "token_not_exist",
                    "access token not recognized",
                )
                .into_response();
            }
            Err(e) => {
                tracing::error!(error = %e, "Permission check failed");
                return ApiError::soft(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "unexpected_error",
                    e.to_string(),
                )
                .into_response();
            }
        };

    if permission < ADMIN_PERMISSION {
        return ApiError::soft(
            StatusCode::FORBIDDEN,
            "permission_denied",
            "admin permission required",
        )
        .into_response();
    }

    next.run(request).await
}

/// Minimum permission claim for the admin routes
pub const ADMIN_PERMISSION: i32 = 10;

/// Pull the token out of the Authorization header; a bare token without
/// the Bearer prefix is accepted too.
pub(crate) fn bearer_token(request: &Request<Body>) -> Option<String> {
    let raw = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
