use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ApiError, Envelope};
use crate::questions::{self, PracticePage, PracticeQuery, QuestionStats, SortColumn, SortOrder};
use crate::storage::models::Question;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PracticeParams {
    #[serde(default)]
    pub course: Option<i32>,
    #[serde(default = "default_all")]
    pub subject: i32,
    #[serde(rename = "type", default = "default_all")]
    pub qtype: i32,
    #[serde(default = "default_sort_column")]
    pub sort_column: String,
    #[serde(default = "default_order")]
    pub order: String,
    #[serde(default)]
    pub next_pid: Option<String>,
    #[serde(default)]
    pub prev_pid: Option<String>,
    #[serde(default)]
    pub index: usize,
}

fn default_all() -> i32 {
    -1
}

fn default_sort_column() -> String {
    "pid".to_string()
}

fn default_order() -> String {
    "asc".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CourseSubjectParams {
    #[serde(default)]
    pub course: Option<i32>,
    #[serde(default = "default_all")]
    pub subject: i32,
}

/// GET /question/practice — one cursor page of the practice sequence
pub async fn practice(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PracticeParams>,
) -> Result<Json<Envelope<PracticePage>>, ApiError> {
    let course = params
        .course
        .ok_or_else(|| ApiError::bad_request("invalid_params", "course is required"))?;

    let query = PracticeQuery {
        course,
        subject: params.subject,
        qtype: params.qtype,
        sort_column: SortColumn::from_param(&params.sort_column),
        order: SortOrder::from_param(&params.order),
        next_pid: params.next_pid,
        prev_pid: params.prev_pid,
        index: params.index,
    };

    let page = questions::practice_page(&state.db, &query)?;
    Ok(Envelope::success(page))
}

/// GET /question/info — repository-wide counts and exam info
pub async fn info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<QuestionStats>>, ApiError> {
    let stats = questions::question_stats(&state.db, &state.config.exam)?;
    Ok(Envelope::success(stats))
}

/// GET /question/all — every question for a course (and subject unless -1)
pub async fn all(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CourseSubjectParams>,
) -> Result<Json<Envelope<Vec<Question>>>, ApiError> {
    let course = params
        .course
        .ok_or_else(|| ApiError::bad_request("invalid_params", "course is required"))?;
    let questions = state
        .db
        .get_questions_by_course_subject(course, params.subject)?;
    Ok(Envelope::success(questions))
}

/// GET /question/:pid — single question row
pub async fn by_pid(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<String>,
) -> Result<Json<Envelope<Question>>, ApiError> {
    state
        .db
        .get_question(&pid)?
        .map(Envelope::success)
        .ok_or_else(|| ApiError::not_found(format!("no question with pid {pid}")))
}
