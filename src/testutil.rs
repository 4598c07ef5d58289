//! Shared test helpers — available to all `#[cfg(test)]` modules in the crate.

use chrono::Utc;
use tempfile::TempDir;

use crate::config::{Config, CrawlConfig, ExamConfig, ServerConfig, TokenConfig};
use crate::storage::models::{Answer, Question, QuestionType, User};
use crate::storage::Database;
use crate::users;

/// Open a fresh database in a temporary directory.
///
/// Returns both the `Database` and the `TempDir` guard — the caller must
/// keep the `TempDir` alive for the duration of the test.
pub fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

/// A minimal `Config` suitable for unit tests (no upstream, local bind).
pub fn test_config() -> Config {
    Config {
        crawl: CrawlConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            times_per_round: 1,
        },
        exam: ExamConfig {
            exam_time: "2027-05-15".to_string(),
            exam_trust: false,
        },
        server: ServerConfig {
            bind_address: "127.0.0.1:8080".to_string(),
            data_dir: "/tmp/test".to_string(),
        },
        tokens: TokenConfig::default(),
    }
}

pub fn test_token_config() -> TokenConfig {
    TokenConfig::default()
}

/// Register a user through the normal service path so encrypted fields and
/// the identifier index are populated like production rows.
pub fn register_user(db: &Database, id_number: &str, name: &str) -> User {
    users::create_user(db, id_number, name, "123456", "测试中学", "美术", None).unwrap()
}

/// Build a `Question` with the given coordinates and placeholder content.
pub fn make_question(pid: &str, course: i32, subject: i32, qtype: i32) -> Question {
    let now_ms = Utc::now().timestamp_millis();
    Question {
        answer: Answer::Flat(vec!["1".to_string()]),
        content: format!("question {pid}"),
        course,
        crawl_count: 1,
        crawl_time: now_ms,
        created_time: now_ms,
        done_count: 0,
        incorrect_count: 0,
        options: None,
        pid: pid.to_string(),
        qtype: QuestionType::from(qtype),
        status: true,
        sub_options: None,
        subject,
        unique_code: crate::crypto::generate_unique_code(),
        updated_time: now_ms,
    }
}
