//! exam-practice - backend for an exam practice platform
//!
//! This crate provides:
//! - Login with rotating asymmetric key pairs and encrypted-at-rest user fields
//! - Access/refresh token pairs with a signed permission claim
//! - Idempotent syncing of crawled question papers with change auditing
//! - Cursor pagination over filtered practice sequences
//! - Active expiration of tokens and login keys via background tasks
//! - redb embedded database (ACID, MVCC, crash-safe)
//! - REST API

pub mod api;
pub mod config;
pub mod crawl;
pub mod crypto;
pub mod expiration;
pub mod questions;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod tokens;
pub mod users;

use config::Config;
use crawl::UpstreamClient;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub upstream: UpstreamClient,
}
