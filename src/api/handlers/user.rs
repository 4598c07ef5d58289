use axum::extract::State;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, Envelope};
use crate::storage::models::{DoneQuestion, StarQuestion};
use crate::tokens::UserProfile;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// Real name with everything past the first character masked
    pub name: String,
    /// Credential with the middle digits masked
    pub id_number: String,
    pub school: String,
    pub profession: String,
    pub profession_main_subject: i32,
    pub permission: i32,
    pub reg_date: String,
    pub last_login: String,
    pub done_cultural: u64,
    pub done_profession: u64,
    pub star_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    #[serde(default)]
    pub pid: Vec<String>,
    /// "delete" removes rows instead of adding them
    #[serde(rename = "type", default)]
    pub operation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkResponse {
    pub affected: usize,
}

// ============================================================================
// Handlers (token guard already resolved the profile)
// ============================================================================

/// GET /user/profile
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
) -> Result<Json<Envelope<ProfileResponse>>, ApiError> {
    let done_cultural = state.db.count_done_questions(&user.uuid, 1, -1)?;
    let done_profession = state.db.count_done_questions(&user.uuid, 2, -1)?;
    let star_count = state.db.get_star_questions(&user.uuid)?.len();

    Ok(Envelope::success(ProfileResponse {
        name: mask_name(&user.name),
        id_number: mask_id_number(&user.id_number),
        school: user.school,
        profession: user.profession,
        profession_main_subject: user.profession_main_subject,
        permission: user.permission,
        reg_date: user.reg_date.to_rfc3339(),
        last_login: user.last_login.to_rfc3339(),
        done_cultural,
        done_profession,
        star_count,
    }))
}

/// GET /user/progress — every done row for the caller
pub async fn list_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
) -> Result<Json<Envelope<Vec<DoneQuestion>>>, ApiError> {
    Ok(Envelope::success(state.db.get_done_questions(&user.uuid)?))
}

/// POST /user/progress — mark pids done (or un-done with op=delete).
/// Fresh marks bump the question's done_count; re-marks don't.
pub async fn mark_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
    Json(body): Json<MarkRequest>,
) -> Result<Json<Envelope<MarkResponse>>, ApiError> {
    if body.operation.as_deref() == Some("delete") {
        let affected = state.db.delete_done_questions(&user.uuid, &body.pid)?;
        return Ok(Envelope::success(MarkResponse { affected }));
    }

    let mut affected = 0;
    for pid in &body.pid {
        if state.db.get_done_question(&user.uuid, pid)?.is_some() {
            continue;
        }
        // Classification comes from the stored row, not the client
        let question = match state.db.get_question(pid)? {
            Some(question) => question,
            None => continue,
        };
        state.db.put_done_question(&DoneQuestion {
            course: question.course,
            done_time: Utc::now().timestamp_millis(),
            pid: pid.clone(),
            qtype: question.qtype,
            subject: question.subject,
            user: user.uuid.clone(),
        })?;
        state.db.update_question(pid, |q| q.done_count += 1)?;
        affected += 1;
    }
    Ok(Envelope::success(MarkResponse { affected }))
}

/// GET /user/star — every starred row for the caller
pub async fn list_stars(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
) -> Result<Json<Envelope<Vec<StarQuestion>>>, ApiError> {
    Ok(Envelope::success(state.db.get_star_questions(&user.uuid)?))
}

/// POST /user/star — star pids into the "wrong" folder (or unstar with
/// op=delete). Fresh stars bump the question's incorrect_count.
pub async fn mark_star(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
    Json(body): Json<MarkRequest>,
) -> Result<Json<Envelope<MarkResponse>>, ApiError> {
    if body.operation.as_deref() == Some("delete") {
        let affected = state.db.delete_star_questions(&user.uuid, &body.pid)?;
        return Ok(Envelope::success(MarkResponse { affected }));
    }

    let mut affected = 0;
    for pid in &body.pid {
        if state.db.get_star_question(&user.uuid, pid)?.is_some() {
            continue;
        }
        let question = match state.db.get_question(pid)? {
            Some(question) => question,
            None => continue,
        };
        state.db.put_star_question(&StarQuestion {
            course: question.course,
            folder: "wrong".to_string(),
            pid: pid.clone(),
            qtype: question.qtype,
            stared_time: Utc::now().timestamp_millis(),
            subject: question.subject,
            user: user.uuid.clone(),
        })?;
        state.db.update_question(pid, |q| q.incorrect_count += 1)?;
        affected += 1;
    }
    Ok(Envelope::success(MarkResponse { affected }))
}

fn mask_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            let rest: String = chars.map(|_| '*').collect();
            format!("{first}{rest}")
        }
        None => String::new(),
    }
}

fn mask_id_number(id_number: &str) -> String {
    let chars: Vec<char> = id_number.chars().collect();
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    let masked = "*".repeat(chars.len() - 10);
    format!("{head}{masked}{tail}")
}
