//! Upstream crawl client and the sequential round runner.
//!
//! Wire types mirror the upstream JSON field names (`dtlx`, `xtlist`, ...)
//! via serde renames; everything past deserialization speaks our domain
//! vocabulary.

use chrono::Utc;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::questions::sync::{self, SyncError};
use crate::storage::models::RequestLog;
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),
}

// ============================================================================
// Wire types
// ============================================================================

/// Top-level crawl payload: groups of questions, one group per paper section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExamPayload {
    #[serde(default)]
    pub list: Option<Vec<RawGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGroup {
    /// Section title; carries the subject name for general-education papers
    #[serde(rename = "dtname", default)]
    pub title: String,
    /// Question type of the section, as a bare number or numeric string
    #[serde(rename = "dtlx", default, deserialize_with = "string_or_number")]
    pub qtype: Option<String>,
    #[serde(rename = "xtlist", default)]
    pub items: Option<Vec<RawQuestion>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuestion {
    #[serde(default, deserialize_with = "string_or_number")]
    pub pid: Option<String>,
    /// Question body
    #[serde(rename = "tg", default)]
    pub content: String,
    /// Options, or sub-questions for nested items
    #[serde(rename = "list", default)]
    pub options: Option<Vec<RawOption>>,
    /// Comma-separated correct option ids
    #[serde(rename = "zqda", default, deserialize_with = "string_or_number")]
    pub correct: Option<String>,
    /// Upstream subject number (professional courses only)
    #[serde(default)]
    pub subject: Option<i32>,
    #[serde(rename = "tjsj", default)]
    pub created: Option<RawTime>,
    #[serde(rename = "xgsj", default)]
    pub updated: Option<RawTime>,
}

/// One option row — or, inside a nested item, one sub-question
/// (then `prompt`/`nested`/`answer` are set instead of `label`/`text`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOption {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(rename = "xx", default)]
    pub label: String,
    #[serde(rename = "txt", default)]
    pub text: String,
    #[serde(rename = "tg", default)]
    pub prompt: Option<String>,
    #[serde(rename = "list", default)]
    pub nested: Option<Vec<RawOption>>,
    #[serde(rename = "da", default, deserialize_with = "string_or_number")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawTime {
    #[serde(default)]
    pub time: i64,
}

/// Outcome of the upstream credential check
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// Upstream rejected the credential outright
    Invalid,
    /// Credential recognized; upstream returned the student record
    Verified(StudentRecord),
    /// Anything else upstream said
    Unrecognized,
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub name: String,
    pub profession: String,
    pub school: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    #[serde(default)]
    outmap: Option<VerifyOutmap>,
}

#[derive(Debug, Deserialize)]
struct VerifyOutmap {
    #[serde(default)]
    err: String,
    #[serde(rename = "xs", default)]
    student: Option<RawStudent>,
}

#[derive(Debug, Deserialize)]
struct RawStudent {
    #[serde(rename = "xm", default)]
    name: String,
    #[serde(rename = "xx", default)]
    school: String,
    #[serde(rename = "zy", default)]
    profession: String,
}

/// Accept upstream values that arrive as either a JSON string or a number
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }))
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone)]
pub struct UpstreamClient {
    base_url: String,
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Ask upstream whether a credential belongs to a registered student
    pub async fn verify_id_number(&self, id_number: &str) -> Result<VerifyOutcome, CrawlError> {
        let url = format!("{}/test32UserLogin", self.base_url);
        let response: VerifyResponse = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "sfz": id_number }))
            .send()
            .await?
            .json()
            .await?;

        let outmap = match response.data.and_then(|d| d.outmap) {
            Some(outmap) => outmap,
            None => return Ok(VerifyOutcome::Unrecognized),
        };

        match outmap.err.as_str() {
            "身份证错误！" => Ok(VerifyOutcome::Invalid),
            "success" => match outmap.student {
                Some(s) => Ok(VerifyOutcome::Verified(StudentRecord {
                    name: s.name,
                    profession: s.profession,
                    school: s.school,
                })),
                None => Ok(VerifyOutcome::Unrecognized),
            },
            _ => Ok(VerifyOutcome::Unrecognized),
        }
    }

    /// Fetch one practice-paper payload for a course, on behalf of a student
    pub async fn fetch_exam_questions(
        &self,
        course: i32,
        user_id: &str,
    ) -> Result<RawExamPayload, CrawlError> {
        let url = format!("{}/getTestSjTmInfo", self.base_url);
        let payload = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "lxlx": course, "xsid": user_id }))
            .send()
            .await?
            .json()
            .await?;
        Ok(payload)
    }
}

// ============================================================================
// Round runner
// ============================================================================

/// Aggregate result of a crawl batch
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub elapsed_ms: i64,
    pub parse_success: bool,
    pub rounds: u32,
}

/// Run `rounds` sequential upstream fetches and sync each payload.
/// Rounds are deliberately serial; parallel fetches trip upstream rate
/// limits. A failed/unparsable round flips the aggregate flag but the batch
/// continues. One RequestLog row records the batch.
pub async fn run_crawl_rounds(
    db: &Database,
    client: &UpstreamClient,
    course: i32,
    subject: i32,
    id_number: &str,
    used_id_number: &str,
    rounds: u32,
) -> Result<CrawlReport, CrawlError> {
    let started = Utc::now();
    let mut parse_success = true;

    for round in 0..rounds {
        let payload = match client.fetch_exam_questions(course, id_number).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(round, error = %e, "Crawl round failed");
                parse_success = false;
                continue;
            }
        };

        let outcome = sync::sync_crawl_payload(db, course, &payload)?;
        if !outcome.parsed {
            parse_success = false;
        }
        tracing::debug!(
            round,
            inserted = outcome.inserted,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            "Crawl round synced"
        );
    }

    let elapsed_ms = (Utc::now() - started).num_milliseconds();

    db.put_request_log(&RequestLog {
        course,
        is_parse: parse_success,
        logged_at: Utc::now(),
        round: rounds,
        subject,
        used_id_number: used_id_number.to_string(),
        uuid: uuid::Uuid::new_v4().to_string(),
    })?;

    Ok(CrawlReport {
        elapsed_ms,
        parse_success,
        rounds,
    })
}
