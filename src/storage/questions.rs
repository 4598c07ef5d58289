use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{Question, UpdatedQuestion};
use super::tables::*;

impl Database {
    // ========================================================================
    // Question operations
    // ========================================================================

    /// Insert or overwrite a question, keyed by pid
    pub fn put_question(&self, question: &Question) -> Result<(), DatabaseError> {
        debug_assert!(!question.pid.is_empty(), "question pid must not be empty");
        debug_assert!(
            !question.unique_code.is_empty(),
            "question unique_code must not be empty"
        );

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(QUESTIONS)?;
            let data = bincode::serialize(question)?;
            table.insert(question.pid.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a question by pid
    pub fn get_question(&self, pid: &str) -> Result<Option<Question>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(QUESTIONS)?;

        match table.get(pid)? {
            Some(data) => Ok(Some(bincode::deserialize(data.value())?)),
            None => Ok(None),
        }
    }

    /// Batch-fetch questions for the given pids. Missing pids are skipped;
    /// the result order follows table order, not input order.
    pub fn get_questions_by_pids(&self, pids: &[String]) -> Result<Vec<Question>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(QUESTIONS)?;

        let mut questions = Vec::with_capacity(pids.len());
        for pid in pids {
            if let Some(data) = table.get(pid.as_str())? {
                questions.push(bincode::deserialize(data.value())?);
            }
        }
        Ok(questions)
    }

    /// All questions for a course+subject pair
    pub fn get_questions_by_course_subject(
        &self,
        course: i32,
        subject: i32,
    ) -> Result<Vec<Question>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(QUESTIONS)?;

        let mut questions = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let question: Question = bincode::deserialize(value.value())?;
            if question.course == course && (subject == -1 || question.subject == subject) {
                questions.push(question);
            }
        }
        Ok(questions)
    }

    /// The pagination coordinate space: (pid, crawl_count) for every question
    /// matching the filter, in table (pid) order. -1 means "all" for subject
    /// and qtype.
    pub fn question_sort_keys(
        &self,
        course: i32,
        subject: i32,
        qtype: i32,
    ) -> Result<Vec<(String, u32)>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(QUESTIONS)?;

        let mut keys = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let question: Question = bincode::deserialize(value.value())?;
            if question.course != course {
                continue;
            }
            if subject != -1 && question.subject != subject {
                continue;
            }
            if qtype != -1 && question.qtype.as_i32() != qtype {
                continue;
            }
            keys.push((question.pid, question.crawl_count));
        }
        Ok(keys)
    }

    /// Count questions for a course (and subject unless -1)
    pub fn count_questions(&self, course: i32, subject: i32) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(QUESTIONS)?;

        let mut count = 0;
        for result in table.iter()? {
            let (_, value) = result?;
            let question: Question = bincode::deserialize(value.value())?;
            if question.course == course && (subject == -1 || question.subject == subject) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Per-type question counts for a course+subject pair
    pub fn question_type_counts(
        &self,
        course: i32,
        subject: i32,
    ) -> Result<Vec<(i32, u64)>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(QUESTIONS)?;

        let mut counts: std::collections::BTreeMap<i32, u64> = std::collections::BTreeMap::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let question: Question = bincode::deserialize(value.value())?;
            if question.course == course && question.subject == subject {
                *counts.entry(question.qtype.as_i32()).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    /// Read-modify-write a single question row. No-op when the pid is absent.
    pub fn update_question<F>(&self, pid: &str, mutate: F) -> Result<bool, DatabaseError>
    where
        F: FnOnce(&mut Question),
    {
        let write_txn = self.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(QUESTIONS)?;
            let existing: Option<Question> = match table.get(pid)? {
                Some(data) => Some(bincode::deserialize(data.value())?),
                None => None,
            };
            match existing {
                Some(mut question) => {
                    mutate(&mut question);
                    let data = bincode::serialize(&question)?;
                    table.insert(pid, data.as_slice())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(updated)
    }

    // ========================================================================
    // UpdatedQuestion audit trail (append-only)
    // ========================================================================

    pub fn put_updated_question(&self, record: &UpdatedQuestion) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(UPDATED_QUESTIONS)?;
            let data = bincode::serialize(record)?;
            table.insert(record.uuid.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_all_updated_questions(&self) -> Result<Vec<UpdatedQuestion>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(UPDATED_QUESTIONS)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            records.push(bincode::deserialize(value.value())?);
        }
        Ok(records)
    }
}
