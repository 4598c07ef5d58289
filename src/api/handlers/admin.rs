use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, Envelope};
use crate::crawl;
use crate::storage::models::RequestInfo;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PermissionCheckResponse {
    pub admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct RequestInfoRequest {
    /// "add", "modify", or "delete"
    #[serde(rename = "op")]
    pub operation: String,
    pub course: i32,
    pub subject: i32,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub profession_id: Option<String>,
    #[serde(default)]
    pub profession_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CrawlRequest {
    pub course: i32,
    pub subject: i32,
    #[serde(default)]
    pub times: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CrawlResponse {
    pub round: u32,
    pub elapsed_ms: i64,
    pub is_parse: bool,
}

// ============================================================================
// Handlers (admin guard has already verified the permission claim)
// ============================================================================

/// GET /admin/percheck — reachable iff the guard let the request through
pub async fn percheck() -> Json<Envelope<PermissionCheckResponse>> {
    Envelope::success(PermissionCheckResponse { admin: true })
}

/// POST /admin/request — manage the per (course, subject) crawling
/// credential records
pub async fn manage_request_info(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RequestInfoRequest>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    match body.operation.as_str() {
        "add" | "modify" => {
            let id_number = body.id_number.ok_or_else(|| {
                ApiError::bad_request("invalid_params", "id_number is required")
            })?;
            let existing = state.db.get_request_info(body.course, body.subject)?;
            state.db.put_request_info(&RequestInfo {
                course: body.course,
                id_number: BASE64.encode(id_number),
                profession_id: body.profession_id,
                profession_name: body.profession_name,
                subject: body.subject,
                uuid: existing
                    .map(|info| info.uuid)
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            })?;
            Ok(Envelope::success(serde_json::json!({ "saved": true })))
        }
        "delete" => {
            let removed = state.db.delete_request_info(body.course, body.subject)?;
            Ok(Envelope::success(serde_json::json!({ "removed": removed })))
        }
        other => Err(ApiError::bad_request(
            "invalid_params",
            format!("unknown operation {other}"),
        )),
    }
}

/// POST /admin/crawl — run N upstream rounds for a course/subject pair
/// using its configured credential
pub async fn trigger_crawl(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CrawlRequest>,
) -> Result<Json<Envelope<CrawlResponse>>, ApiError> {
    let info = state
        .db
        .get_request_info(body.course, body.subject)?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "no crawl credential for course {} subject {}",
                body.course, body.subject
            ))
        })?;

    let id_number = BASE64
        .decode(&info.id_number)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| ApiError::internal("stored crawl credential is unreadable"))?;

    let rounds = body.times.unwrap_or(state.config.crawl.times_per_round);
    let report = crawl::run_crawl_rounds(
        &state.db,
        &state.upstream,
        body.course,
        body.subject,
        &id_number,
        &info.id_number,
        rounds,
    )
    .await?;

    tracing::info!(
        course = body.course,
        subject = body.subject,
        rounds = report.rounds,
        elapsed_ms = report.elapsed_ms,
        "Crawl batch finished"
    );

    Ok(Envelope::success(CrawlResponse {
        round: report.rounds,
        elapsed_ms: report.elapsed_ms,
        is_parse: report.parse_success,
    }))
}
