//! Question repository services: crawl sync, practice pagination, and
//! repository stats.

pub mod sequencer;
pub mod stats;
pub mod sync;

pub use sequencer::{practice_page, PracticePage, PracticeQuery, SortColumn, SortOrder, PAGE_SIZE};
pub use stats::{question_stats, QuestionStats};
pub use sync::{sync_crawl_payload, SyncError, SyncOutcome};
