use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Error,
    Success,
}

/// The uniform response envelope. `code` mirrors the HTTP status for
/// ordinary responses; auth failures keep HTTP 200 and carry their real
/// code here, so clients branch on `code` rather than transport status.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T: Serialize> {
    pub code: u16,
    pub status: EnvelopeStatus,
    pub data: T,
    /// Epoch millis at serialization time
    pub timestamp: i64,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Json<Envelope<T>> {
        Json(Envelope {
            code: StatusCode::OK.as_u16(),
            status: EnvelopeStatus::Success,
            data,
            timestamp: Utc::now().timestamp_millis(),
        })
    }
}

// ============================================================================
// Error envelope
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// A client-visible failure with a machine-readable reason kind.
/// Used as the error type in handler Result returns.
#[derive(Debug)]
pub struct ApiError {
    /// Envelope code; also the HTTP status unless `soft` is set
    pub code: StatusCode,
    pub kind: String,
    pub message: String,
    /// Deliver over HTTP 200 (auth-guard convention)
    pub soft: bool,
}

impl ApiError {
    pub fn new(code: StatusCode, kind: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError {
            code,
            kind: kind.into(),
            message: message.into(),
            soft: false,
        }
    }

    /// An error envelope delivered over HTTP 200. The token guard and its
    /// downstream reasons use this shape exclusively.
    pub fn soft(code: StatusCode, kind: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError {
            soft: true,
            ..Self::new(code, kind, message)
        }
    }

    pub fn bad_request(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, kind, message)
    }

    pub fn unauthorized(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, kind, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "unexpected_error",
            message,
        )
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let envelope = Envelope {
            code: self.code.as_u16(),
            status: EnvelopeStatus::Error,
            data: ErrorData {
                kind: self.kind,
                message: self.message,
            },
            timestamp: Utc::now().timestamp_millis(),
        };
        let http_status = if self.soft { StatusCode::OK } else { self.code };
        (http_status, Json(envelope)).into_response()
    }
}

// Handler bodies bubble storage/service errors with `?`; anything that was
// not pre-empted by an explicit check surfaces as unexpected_error.
impl From<crate::storage::DatabaseError> for ApiError {
    fn from(e: crate::storage::DatabaseError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<crate::crypto::CryptoError> for ApiError {
    fn from(e: crate::crypto::CryptoError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<crate::tokens::TokenError> for ApiError {
    fn from(e: crate::tokens::TokenError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<crate::users::UserError> for ApiError {
    fn from(e: crate::users::UserError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<crate::crawl::CrawlError> for ApiError {
    fn from(e: crate::crawl::CrawlError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<crate::questions::SyncError> for ApiError {
    fn from(e: crate::questions::SyncError) -> Self {
        ApiError::internal(e.to_string())
    }
}
