use redb::TableDefinition;

/// Question bank: pid -> Question (bincode)
pub const QUESTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("questions");

/// Re-crawl audit trail: row uuid -> UpdatedQuestion (bincode). Append-only.
pub const UPDATED_QUESTIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("updated_questions");

/// Users: uuid -> User (bincode)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Secondary index: identifier hash -> user uuid (credential lookup)
pub const USER_IDENTIFIERS: TableDefinition<&str, &str> =
    TableDefinition::new("user_identifiers");

/// Issued token pairs: user uuid -> TokenPair (bincode). One live pair per user.
pub const TOKENS: TableDefinition<&str, &[u8]> = TableDefinition::new("tokens");

/// Secondary index: access_token -> user uuid
pub const TOKENS_BY_ACCESS: TableDefinition<&str, &str> = TableDefinition::new("tokens_by_access");

/// Secondary index: refresh_token -> user uuid
pub const TOKENS_BY_REFRESH: TableDefinition<&str, &str> =
    TableDefinition::new("tokens_by_refresh");

/// Rotating login key pairs: row uuid -> LoginKey (bincode)
pub const LOGIN_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("login_keys");

/// Crawl credentials: "course:subject" -> RequestInfo (bincode)
pub const REQUEST_INFO: TableDefinition<&str, &[u8]> = TableDefinition::new("request_info");

/// Crawl round log: row uuid -> RequestLog (bincode)
pub const REQUEST_LOG: TableDefinition<&str, &[u8]> = TableDefinition::new("request_log");

/// Per-user progress: "user:pid" -> DoneQuestion (bincode)
pub const DONE_QUESTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("done_questions");

/// Per-user favorites: "user:pid" -> StarQuestion (bincode)
pub const STAR_QUESTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("star_questions");
