mod admin;
mod auth;
mod question;
mod user;

pub use admin::{manage_request_info, percheck, trigger_crawl};
pub use auth::{get_public_key, login, refresh};
pub use question::{all, by_pid, info, practice};
pub use user::{list_progress, list_stars, mark_progress, mark_star, profile};
