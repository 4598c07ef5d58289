use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{LoginKey, TokenPair};
use super::tables::*;

impl Database {
    // ========================================================================
    // Token pair operations
    // ========================================================================

    /// Store a token pair for a user, replacing any prior pair and its
    /// secondary-index rows.
    pub fn put_token_pair(&self, pair: &TokenPair) -> Result<(), DatabaseError> {
        debug_assert!(!pair.uuid.is_empty(), "token pair uuid must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(TOKENS)?;

            // Drop index rows of the pair being replaced
            let previous: Option<TokenPair> = match table.get(pair.uuid.as_str())? {
                Some(data) => Some(bincode::deserialize(data.value())?),
                None => None,
            };

            let data = bincode::serialize(pair)?;
            table.insert(pair.uuid.as_str(), data.as_slice())?;

            let mut access_index = write_txn.open_table(TOKENS_BY_ACCESS)?;
            let mut refresh_index = write_txn.open_table(TOKENS_BY_REFRESH)?;

            if let Some(prev) = previous {
                access_index.remove(prev.access_token.as_str())?;
                refresh_index.remove(prev.refresh_token.as_str())?;
            }

            access_index.insert(pair.access_token.as_str(), pair.uuid.as_str())?;
            refresh_index.insert(pair.refresh_token.as_str(), pair.uuid.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get the live token pair for a user
    pub fn get_token_pair(&self, uuid: &str) -> Result<Option<TokenPair>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(TOKENS)?;

        match table.get(uuid)? {
            Some(data) => Ok(Some(bincode::deserialize(data.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a token pair by its access token
    pub fn get_token_pair_by_access(
        &self,
        access_token: &str,
    ) -> Result<Option<TokenPair>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(TOKENS_BY_ACCESS)?;

        let uuid: String = match index.get(access_token)? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(TOKENS)?;
        match table.get(uuid.as_str())? {
            Some(data) => Ok(Some(bincode::deserialize(data.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a token pair by its refresh token
    pub fn get_token_pair_by_refresh(
        &self,
        refresh_token: &str,
    ) -> Result<Option<TokenPair>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(TOKENS_BY_REFRESH)?;

        let uuid: String = match index.get(refresh_token)? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(TOKENS)?;
        match table.get(uuid.as_str())? {
            Some(data) => Ok(Some(bincode::deserialize(data.value())?)),
            None => Ok(None),
        }
    }

    /// Delete a user's token pair and its index rows
    pub fn delete_token_pair(&self, uuid: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let pair: Option<TokenPair> = {
            let table = write_txn.open_table(TOKENS)?;
            let row = match table.get(uuid)? {
                Some(data) => Some(bincode::deserialize(data.value())?),
                None => None,
            };
            row
        };

        let deleted = match pair {
            Some(pair) => {
                {
                    let mut table = write_txn.open_table(TOKENS)?;
                    table.remove(uuid)?;
                }
                {
                    let mut access_index = write_txn.open_table(TOKENS_BY_ACCESS)?;
                    access_index.remove(pair.access_token.as_str())?;
                }
                {
                    let mut refresh_index = write_txn.open_table(TOKENS_BY_REFRESH)?;
                    refresh_index.remove(pair.refresh_token.as_str())?;
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Get all token pairs (for expiration cleanup)
    pub fn get_all_token_pairs(&self) -> Result<Vec<TokenPair>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(TOKENS)?;

        let mut pairs = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            pairs.push(bincode::deserialize(value.value())?);
        }
        Ok(pairs)
    }

    // ========================================================================
    // Login key operations
    // ========================================================================

    pub fn put_login_key(&self, key: &LoginKey) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(LOGIN_KEYS)?;
            let data = bincode::serialize(key)?;
            table.insert(key.uuid.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get all login keys, expired rows included (rotation keeps old rows
    /// around until the sweep removes them)
    pub fn get_all_login_keys(&self) -> Result<Vec<LoginKey>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(LOGIN_KEYS)?;

        let mut keys = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            keys.push(bincode::deserialize(value.value())?);
        }
        Ok(keys)
    }

    pub fn delete_login_key(&self, uuid: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(LOGIN_KEYS)?;
            let removed = table.remove(uuid)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}
