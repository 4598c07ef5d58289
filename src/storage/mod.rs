pub mod db;
pub mod models;
mod questions;
mod requests;
mod tables;
mod tokens;
mod users;

pub use db::{course_subject_key, user_pid_key, Database, DatabaseError};
pub use tables::*;
