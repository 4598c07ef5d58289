use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Question classification as reported by the upstream source.
///
/// Upstream sends a bare number; values other than the known four are kept
/// as-is so a re-crawl never loses information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    TrueFalse,
    /// Reading-comprehension item carrying nested sub-questions
    Nested,
    Other(i32),
}

impl From<i32> for QuestionType {
    fn from(value: i32) -> Self {
        match value {
            1 => QuestionType::SingleChoice,
            2 => QuestionType::MultiChoice,
            3 => QuestionType::TrueFalse,
            8 => QuestionType::Nested,
            other => QuestionType::Other(other),
        }
    }
}

impl From<QuestionType> for i32 {
    fn from(value: QuestionType) -> Self {
        match value {
            QuestionType::SingleChoice => 1,
            QuestionType::MultiChoice => 2,
            QuestionType::TrueFalse => 3,
            QuestionType::Nested => 8,
            QuestionType::Other(other) => other,
        }
    }
}

impl QuestionType {
    pub fn as_i32(self) -> i32 {
        self.into()
    }
}

/// A single answer option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Upstream option id (referenced by answers)
    pub id: String,
    /// Option label, e.g. "A"
    pub label: String,
    pub text: String,
}

/// A sub-question of a nested/reading item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    pub prompt: String,
    pub options: Option<Vec<QuestionOption>>,
}

/// Correct answer: a flat id list, or one list per sub-question for nested items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Flat(Vec<String>),
    Nested(Vec<Vec<String>>),
}

impl Answer {
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Flat(ids) => ids.is_empty(),
            Answer::Nested(lists) => lists.is_empty(),
        }
    }
}

/// A crawled exam question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Flat answer id list, or per-sub-question lists for nested items
    pub answer: Answer,
    pub content: String,
    /// Top-level category: 1 general education, 2 professional
    pub course: i32,
    /// Number of times a crawl has seen this pid
    pub crawl_count: u32,
    /// When this row was last crawled (epoch millis)
    pub crawl_time: i64,
    /// Upstream creation timestamp (epoch millis)
    pub created_time: i64,
    /// Users who have completed this question
    pub done_count: u32,
    /// Users who have gotten this question wrong
    pub incorrect_count: u32,
    /// Flat options; None when the item defers to sub_options
    pub options: Option<Vec<QuestionOption>>,
    /// Upstream-assigned identifier, stable across crawls
    pub pid: String,
    pub qtype: QuestionType,
    /// Active flag
    pub status: bool,
    /// Sub-questions for nested/reading items
    pub sub_options: Option<Vec<SubQuestion>>,
    /// Sub-category within the course
    pub subject: i32,
    /// Internally generated identifier, immutable once assigned
    pub unique_code: String,
    /// Upstream modification timestamp (epoch millis)
    pub updated_time: i64,
}

/// Audit snapshot written when a re-crawl changes a stored question.
/// Append-only; rows are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatedQuestion {
    pub course: i32,
    pub pid: String,
    pub qtype: QuestionType,
    pub subject: i32,
    pub unique_code: String,
    /// When the diff was detected (epoch millis)
    pub updated_time: i64,
    pub uuid: String,
}

/// Per (course, subject) crawling credential record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestInfo {
    pub course: i32,
    /// base64 of the decrypted upstream credential
    pub id_number: String,
    pub profession_id: Option<String>,
    pub profession_name: Option<String>,
    pub subject: i32,
    pub uuid: String,
}

/// One row per manually triggered crawl batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLog {
    pub course: i32,
    /// Whether every round's payload parsed
    pub is_parse: bool,
    pub logged_at: DateTime<Utc>,
    /// Requests issued in this batch
    pub round: u32,
    pub subject: i32,
    pub used_id_number: String,
    pub uuid: String,
}

/// An issued access/refresh token pair. One live pair per user;
/// re-issuance overwrites the previous pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    /// Epoch millis
    pub access_token_expiry: i64,
    pub refresh_token: String,
    /// Epoch millis
    pub refresh_token_expiry: i64,
    pub uuid: String,
}

impl TokenPair {
    /// Expired when either half of the pair has lapsed
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        now_millis > self.access_token_expiry || now_millis > self.refresh_token_expiry
    }
}

/// A rotating asymmetric key pair used for the login handshake.
/// Multiple rows may coexist; the currently valid one has the latest
/// non-expired expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginKey {
    pub expiry_time: DateTime<Utc>,
    /// PKCS#8 PEM private key; the public half is derived on demand
    pub private_key_pem: String,
    pub uuid: String,
}

impl LoginKey {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time < now
    }
}

/// A registered user. Sensitive fields are stored encrypted
/// ("ciphertext$key") or hashed; see the crypto module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Lookup hash of the plaintext credential
    pub identifier: String,
    /// Encrypted national-id credential ("ciphertext$key")
    pub id_number: String,
    pub last_login: DateTime<Utc>,
    /// Encrypted real name ("ciphertext$key")
    pub name: String,
    /// One-way hash
    pub password: String,
    /// Access level; admin endpoints require >= 10
    pub permission: i32,
    pub profession: String,
    /// Subject number of the user's main professional course, -1 when unset
    pub profession_main_subject: i32,
    pub reg_date: DateTime<Utc>,
    pub school: String,
    pub uuid: String,
}

/// A question the user has completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneQuestion {
    pub course: i32,
    /// Epoch millis
    pub done_time: i64,
    pub pid: String,
    pub qtype: QuestionType,
    pub subject: i32,
    pub user: String,
}

/// A question the user has starred
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarQuestion {
    pub course: i32,
    pub folder: String,
    pub pid: String,
    pub qtype: QuestionType,
    /// Epoch millis
    pub stared_time: i64,
    pub subject: i32,
    pub user: String,
}
