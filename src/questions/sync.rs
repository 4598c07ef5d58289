//! Idempotent upsert of crawled payloads into the question store.
//!
//! Every sighting of a pid bumps its crawl_count. A content/options/answer
//! change additionally snapshots the old row into the updated-question audit
//! table before overwriting. Counters and the unique_code always survive
//! overwrites.

use chrono::Utc;
use thiserror::Error;

use crate::crawl::{RawExamPayload, RawOption, RawQuestion};
use crate::crypto;
use crate::storage::models::{
    Answer, Question, QuestionOption, QuestionType, SubQuestion, UpdatedQuestion,
};
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// What a single payload sync did
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOutcome {
    /// False when the payload carried no question list at all
    pub parsed: bool,
    pub inserted: u32,
    pub updated: u32,
    pub unchanged: u32,
}

/// Sync one crawled paper into storage. Safe to re-run on identical
/// payloads: re-sightings only bump crawl_count.
pub fn sync_crawl_payload(
    db: &Database,
    course: i32,
    payload: &RawExamPayload,
) -> Result<SyncOutcome, SyncError> {
    let groups = match &payload.list {
        Some(groups) => groups,
        None => return Ok(SyncOutcome::default()),
    };

    let mut outcome = SyncOutcome {
        parsed: true,
        ..SyncOutcome::default()
    };

    for group in groups {
        let qtype_num: i32 = group
            .qtype
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        let qtype = QuestionType::from(qtype_num);

        let items = match &group.items {
            Some(items) => items,
            None => continue,
        };

        // General-education papers carry the subject in the section title;
        // professional papers carry an upstream subject number per item.
        let title_subject = subject_from_title(&group.title);

        for item in items {
            let pid = match &item.pid {
                Some(pid) if !pid.is_empty() => pid.clone(),
                _ => continue,
            };

            let subject = if course == 1 {
                title_subject
            } else {
                resolve_profession_subject(db, course, item.subject)?
            };

            let existing = db.get_question(&pid)?;
            let incoming = build_question(course, subject, qtype, &pid, item, existing.as_ref());

            match existing {
                None => {
                    db.put_question(&incoming)?;
                    outcome.inserted += 1;
                }
                Some(old) => {
                    let changed = old.content != incoming.content
                        || old.options != incoming.options
                        || old.answer != incoming.answer;
                    if changed {
                        record_revision(db, &old)?;
                        db.put_question(&incoming)?;
                        outcome.updated += 1;
                        tracing::info!(pid = %pid, "Question content changed on re-crawl");
                    } else {
                        db.update_question(&pid, |q| q.crawl_count += 1)?;
                        outcome.unchanged += 1;
                    }
                }
            }
        }
    }

    Ok(outcome)
}

/// Map a general-education section title to its subject number
fn subject_from_title(title: &str) -> i32 {
    if title.contains("语文") {
        1
    } else if title.contains("数学") {
        2
    } else if title.contains("英语") {
        3
    } else if title.contains("政治") {
        4
    } else {
        0
    }
}

/// Professional payloads reference subjects by an upstream number that maps
/// through the crawling-credential records; unknown numbers land in subject 0
fn resolve_profession_subject(
    db: &Database,
    course: i32,
    upstream_subject: Option<i32>,
) -> Result<i32, SyncError> {
    let upstream_subject = match upstream_subject {
        Some(n) => n,
        None => return Ok(0),
    };
    Ok(db
        .get_request_info(course, upstream_subject)?
        .map(|info| info.subject)
        .unwrap_or(0))
}

fn build_question(
    course: i32,
    subject: i32,
    qtype: QuestionType,
    pid: &str,
    item: &RawQuestion,
    existing: Option<&Question>,
) -> Question {
    // Declared type 8, or any option carrying its own list, means
    // sub-questions rather than flat options
    let nested = qtype == QuestionType::Nested
        || item
            .options
            .as_deref()
            .map(|opts| opts.iter().any(|o| o.nested.is_some()))
            .unwrap_or(false);

    let (options, sub_options, answer) = if nested {
        let subs = item.options.as_deref().unwrap_or(&[]);
        (None, Some(parse_sub_questions(subs)), parse_sub_answers(subs))
    } else {
        (
            item.options.as_deref().map(parse_options),
            None,
            parse_flat_answer(item.correct.as_deref()),
        )
    };

    let now_ms = Utc::now().timestamp_millis();

    Question {
        answer,
        content: item.content.clone(),
        course,
        crawl_count: existing.map(|q| q.crawl_count + 1).unwrap_or(1),
        crawl_time: now_ms,
        created_time: item.created.map(|t| t.time).unwrap_or(0),
        done_count: existing.map(|q| q.done_count).unwrap_or(0),
        incorrect_count: existing.map(|q| q.incorrect_count).unwrap_or(0),
        options,
        pid: pid.to_string(),
        qtype,
        status: true,
        sub_options,
        subject,
        unique_code: existing
            .map(|q| q.unique_code.clone())
            .unwrap_or_else(crypto::generate_unique_code),
        updated_time: item.updated.map(|t| t.time).unwrap_or(0),
    }
}

fn parse_options(raw: &[RawOption]) -> Vec<QuestionOption> {
    raw.iter()
        .map(|o| QuestionOption {
            id: o.id.clone().unwrap_or_default(),
            label: o.label.clone(),
            text: o.text.clone(),
        })
        .collect()
}

fn parse_sub_questions(raw: &[RawOption]) -> Vec<SubQuestion> {
    raw.iter()
        .map(|sub| SubQuestion {
            prompt: sub.prompt.clone().unwrap_or_default(),
            options: sub.nested.as_deref().map(parse_options),
        })
        .collect()
}

fn parse_sub_answers(raw: &[RawOption]) -> Answer {
    Answer::Nested(
        raw.iter()
            .map(|sub| parse_id_list(sub.answer.as_deref()))
            .collect(),
    )
}

fn parse_flat_answer(correct: Option<&str>) -> Answer {
    Answer::Flat(parse_id_list(correct))
}

fn parse_id_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn record_revision(db: &Database, old: &Question) -> Result<(), SyncError> {
    db.put_updated_question(&UpdatedQuestion {
        course: old.course,
        pid: old.pid.clone(),
        qtype: old.qtype,
        subject: old.subject,
        unique_code: old.unique_code.clone(),
        updated_time: Utc::now().timestamp_millis(),
        uuid: uuid::Uuid::new_v4().to_string(),
    })?;
    Ok(())
}
