use redb::ReadableTableMetadata;

use super::db::{user_pid_key, user_prefix_range, Database, DatabaseError};
use super::models::{DoneQuestion, StarQuestion, User};
use super::tables::*;

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Insert or overwrite a user, maintaining the identifier index
    pub fn put_user(&self, user: &User) -> Result<(), DatabaseError> {
        debug_assert!(!user.uuid.is_empty(), "user uuid must not be empty");
        debug_assert!(
            !user.identifier.is_empty(),
            "user identifier must not be empty"
        );

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            let data = bincode::serialize(user)?;
            table.insert(user.uuid.as_str(), data.as_slice())?;

            let mut index_table = write_txn.open_table(USER_IDENTIFIERS)?;
            index_table.insert(user.identifier.as_str(), user.uuid.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a user by uuid
    pub fn get_user(&self, uuid: &str) -> Result<Option<User>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(uuid)? {
            Some(data) => Ok(Some(bincode::deserialize(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get a user through the identifier-hash index
    pub fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index_table = read_txn.open_table(USER_IDENTIFIERS)?;

        let uuid: String = match index_table.get(identifier)? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(USERS)?;
        match table.get(uuid.as_str())? {
            Some(data) => Ok(Some(bincode::deserialize(data.value())?)),
            None => Ok(None),
        }
    }

    /// Count registered users
    pub fn count_users(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        Ok(table.len()?)
    }

    // ========================================================================
    // Progress (done questions)
    // ========================================================================

    pub fn put_done_question(&self, record: &DoneQuestion) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(DONE_QUESTIONS)?;
            let data = bincode::serialize(record)?;
            let key = user_pid_key(&record.user, &record.pid);
            table.insert(key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_done_questions(&self, user: &str) -> Result<Vec<DoneQuestion>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DONE_QUESTIONS)?;

        let (lo, hi) = user_prefix_range(user);
        let mut records = Vec::new();
        for result in table.range(lo.as_str()..hi.as_str())? {
            let (_, value) = result?;
            records.push(bincode::deserialize(value.value())?);
        }
        Ok(records)
    }

    pub fn get_done_question(
        &self,
        user: &str,
        pid: &str,
    ) -> Result<Option<DoneQuestion>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DONE_QUESTIONS)?;

        match table.get(user_pid_key(user, pid).as_str())? {
            Some(data) => Ok(Some(bincode::deserialize(data.value())?)),
            None => Ok(None),
        }
    }

    /// Delete done rows for the given pids; returns how many existed
    pub fn delete_done_questions(
        &self,
        user: &str,
        pids: &[String],
    ) -> Result<usize, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut deleted = 0;
        {
            let mut table = write_txn.open_table(DONE_QUESTIONS)?;
            for pid in pids {
                if table.remove(user_pid_key(user, pid).as_str())?.is_some() {
                    deleted += 1;
                }
            }
        }
        write_txn.commit()?;
        Ok(deleted)
    }

    /// Count done rows for a user, optionally restricted by course and subject
    /// (-1 means "all")
    pub fn count_done_questions(
        &self,
        user: &str,
        course: i32,
        subject: i32,
    ) -> Result<u64, DatabaseError> {
        let done = self.get_done_questions(user)?;
        Ok(done
            .iter()
            .filter(|d| d.course == course && (subject == -1 || d.subject == subject))
            .count() as u64)
    }

    // ========================================================================
    // Favorites (starred questions)
    // ========================================================================

    pub fn put_star_question(&self, record: &StarQuestion) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(STAR_QUESTIONS)?;
            let data = bincode::serialize(record)?;
            let key = user_pid_key(&record.user, &record.pid);
            table.insert(key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_star_questions(&self, user: &str) -> Result<Vec<StarQuestion>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(STAR_QUESTIONS)?;

        let (lo, hi) = user_prefix_range(user);
        let mut records = Vec::new();
        for result in table.range(lo.as_str()..hi.as_str())? {
            let (_, value) = result?;
            records.push(bincode::deserialize(value.value())?);
        }
        Ok(records)
    }

    pub fn get_star_question(
        &self,
        user: &str,
        pid: &str,
    ) -> Result<Option<StarQuestion>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(STAR_QUESTIONS)?;

        match table.get(user_pid_key(user, pid).as_str())? {
            Some(data) => Ok(Some(bincode::deserialize(data.value())?)),
            None => Ok(None),
        }
    }

    /// Delete star rows for the given pids; returns how many existed
    pub fn delete_star_questions(
        &self,
        user: &str,
        pids: &[String],
    ) -> Result<usize, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut deleted = 0;
        {
            let mut table = write_txn.open_table(STAR_QUESTIONS)?;
            for pid in pids {
                if table.remove(user_pid_key(user, pid).as_str())?.is_some() {
                    deleted += 1;
                }
            }
        }
        write_txn.commit()?;
        Ok(deleted)
    }
}
