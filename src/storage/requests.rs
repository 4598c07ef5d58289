use redb::ReadableTable;

use super::db::{course_subject_key, Database, DatabaseError};
use super::models::{RequestInfo, RequestLog};
use super::tables::*;

impl Database {
    // ========================================================================
    // Crawl-credential (RequestInfo) operations
    // ========================================================================

    pub fn put_request_info(&self, info: &RequestInfo) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(REQUEST_INFO)?;
            let data = bincode::serialize(info)?;
            let key = course_subject_key(info.course, info.subject);
            table.insert(key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_request_info(
        &self,
        course: i32,
        subject: i32,
    ) -> Result<Option<RequestInfo>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REQUEST_INFO)?;

        match table.get(course_subject_key(course, subject).as_str())? {
            Some(data) => Ok(Some(bincode::deserialize(data.value())?)),
            None => Ok(None),
        }
    }

    /// Find the credential row for a profession by display name
    pub fn get_request_info_by_profession(
        &self,
        profession_name: &str,
    ) -> Result<Option<RequestInfo>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REQUEST_INFO)?;

        for result in table.iter()? {
            let (_, value) = result?;
            let info: RequestInfo = bincode::deserialize(value.value())?;
            if info.profession_name.as_deref() == Some(profession_name) {
                return Ok(Some(info));
            }
        }
        Ok(None)
    }

    /// All credential rows for a course
    pub fn list_request_info(&self, course: i32) -> Result<Vec<RequestInfo>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REQUEST_INFO)?;

        let mut rows = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let info: RequestInfo = bincode::deserialize(value.value())?;
            if info.course == course {
                rows.push(info);
            }
        }
        Ok(rows)
    }

    pub fn delete_request_info(&self, course: i32, subject: i32) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(REQUEST_INFO)?;
            let removed = table
                .remove(course_subject_key(course, subject).as_str())?
                .is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    // ========================================================================
    // Crawl round log
    // ========================================================================

    pub fn put_request_log(&self, log: &RequestLog) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(REQUEST_LOG)?;
            let data = bincode::serialize(log)?;
            table.insert(log.uuid.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
