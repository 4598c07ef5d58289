use redb::{Database as RedbDatabase, ReadTransaction, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Redb(#[from] redb::Error),
    #[error("Database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
}

#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("exam-practice.redb");
        let db = RedbDatabase::create(db_path)?;

        // Create tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(QUESTIONS)?;
            let _ = write_txn.open_table(UPDATED_QUESTIONS)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_IDENTIFIERS)?;
            let _ = write_txn.open_table(TOKENS)?;
            let _ = write_txn.open_table(TOKENS_BY_ACCESS)?;
            let _ = write_txn.open_table(TOKENS_BY_REFRESH)?;
            let _ = write_txn.open_table(LOGIN_KEYS)?;
            let _ = write_txn.open_table(REQUEST_INFO)?;
            let _ = write_txn.open_table(REQUEST_LOG)?;
            let _ = write_txn.open_table(DONE_QUESTIONS)?;
            let _ = write_txn.open_table(STAR_QUESTIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }
}

/// Composite key for the per-user progress/star tables
pub fn user_pid_key(user: &str, pid: &str) -> String {
    format!("{user}:{pid}")
}

/// Range bounds covering every `"{user}:*"` key.
/// `';'` is the successor of `':'` in ASCII.
pub fn user_prefix_range(user: &str) -> (String, String) {
    (format!("{user}:"), format!("{user};"))
}

/// Composite key for the crawl-credential table
pub fn course_subject_key(course: i32, subject: i32) -> String {
    format!("{course}:{subject}")
}
