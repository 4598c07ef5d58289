//! Cursor pagination over a filtered, sorted pid sequence.
//!
//! Each request recomputes the full sequence from storage, so pages stay
//! consistent with whatever the latest crawl wrote. Cursors are pids, not
//! offsets: the client hands back the pid it last saw and we locate it in
//! the fresh sequence.

use serde::Serialize;

use crate::storage::models::Question;
use crate::storage::{Database, DatabaseError};

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything that isn't "desc" sorts ascending
    pub fn from_param(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Pid,
    CrawlCount,
}

impl SortColumn {
    /// Allow-listed sort columns; anything else silently falls back to pid
    pub fn from_param(raw: &str) -> Self {
        match raw {
            "crawl_count" => SortColumn::CrawlCount,
            _ => SortColumn::Pid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortColumn::Pid => "pid",
            SortColumn::CrawlCount => "crawl_count",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PracticeQuery {
    pub course: i32,
    /// -1 means all subjects
    pub subject: i32,
    /// -1 means all types
    pub qtype: i32,
    pub sort_column: SortColumn,
    pub order: SortOrder,
    /// Resume after this pid (wins over prev_pid and index)
    pub next_pid: Option<String>,
    /// Page back from this pid
    pub prev_pid: Option<String>,
    /// Absolute starting offset when no cursor is given
    pub index: usize,
}

/// Echo of the filter plus the sequence size, returned with every page
#[derive(Debug, Clone, Serialize)]
pub struct PracticeStat {
    pub course: i32,
    pub subject: i32,
    #[serde(rename = "type")]
    pub qtype: i32,
    pub order: String,
    pub sort_column: String,
    pub total_questions: usize,
}

/// A question annotated with its 1-based position in the full sequence
#[derive(Debug, Clone, Serialize)]
pub struct PositionedQuestion {
    pub index: usize,
    #[serde(flatten)]
    pub question: Question,
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticePage {
    /// The complete ordered pid sequence the page was cut from
    pub sequence: Vec<String>,
    pub questions: Vec<PositionedQuestion>,
    /// Set iff questions remain after this page; pass back to continue
    pub next_pid: Option<String>,
    /// Set iff questions precede this page
    pub prev_pid: Option<String>,
    pub stat: PracticeStat,
}

/// Cut one page out of the filtered, sorted sequence.
///
/// A cursor pid that no longer exists in the sequence yields an empty page
/// with both cursors unset, never an error: the client restarts from an
/// explicit index.
pub fn practice_page(db: &Database, query: &PracticeQuery) -> Result<PracticePage, DatabaseError> {
    let mut keys = db.question_sort_keys(query.course, query.subject, query.qtype)?;

    match (query.sort_column, query.order) {
        (SortColumn::Pid, SortOrder::Asc) => keys.sort_by(|a, b| a.0.cmp(&b.0)),
        (SortColumn::Pid, SortOrder::Desc) => keys.sort_by(|a, b| b.0.cmp(&a.0)),
        (SortColumn::CrawlCount, SortOrder::Asc) => keys.sort_by(|a, b| a.1.cmp(&b.1)),
        (SortColumn::CrawlCount, SortOrder::Desc) => keys.sort_by(|a, b| b.1.cmp(&a.1)),
    }

    let sequence: Vec<String> = keys.into_iter().map(|(pid, _)| pid).collect();
    let total = sequence.len();

    let offset = if let Some(next) = &query.next_pid {
        match sequence.iter().position(|pid| pid == next) {
            Some(pos) => pos + 1,
            None => return Ok(empty_page(sequence, query)),
        }
    } else if let Some(prev) = &query.prev_pid {
        match sequence.iter().position(|pid| pid == prev) {
            Some(pos) => pos.saturating_sub(PAGE_SIZE),
            None => return Ok(empty_page(sequence, query)),
        }
    } else {
        query.index.min(total)
    };

    let end = (offset + PAGE_SIZE).min(total);
    let page_pids = &sequence[offset..end];

    let fetched = db.get_questions_by_pids(page_pids)?;
    // Restore sequence order; the store returns table order
    let mut questions = Vec::with_capacity(page_pids.len());
    for (i, pid) in page_pids.iter().enumerate() {
        if let Some(question) = fetched.iter().find(|q| &q.pid == pid) {
            questions.push(PositionedQuestion {
                index: offset + i + 1,
                question: question.clone(),
            });
        }
    }

    let next_pid = if end < total {
        page_pids.last().cloned()
    } else {
        None
    };
    let prev_pid = if offset > 0 {
        page_pids.first().cloned()
    } else {
        None
    };

    Ok(PracticePage {
        stat: stat_for(query, total),
        sequence,
        questions,
        next_pid,
        prev_pid,
    })
}

fn empty_page(sequence: Vec<String>, query: &PracticeQuery) -> PracticePage {
    let total = sequence.len();
    PracticePage {
        sequence,
        questions: Vec::new(),
        next_pid: None,
        prev_pid: None,
        stat: stat_for(query, total),
    }
}

fn stat_for(query: &PracticeQuery, total: usize) -> PracticeStat {
    PracticeStat {
        course: query.course,
        subject: query.subject,
        qtype: query.qtype,
        order: query.order.as_str().to_string(),
        sort_column: query.sort_column.as_str().to_string(),
        total_questions: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_question, setup_db};

    fn seed(db: &Database, count: usize) -> Vec<String> {
        // Insert out of pid order to prove sorting does the work
        let mut pids: Vec<String> = (1..=count).map(|i| format!("q{:02}", i)).collect();
        let shuffled: Vec<String> = pids.iter().rev().cloned().collect();
        for pid in &shuffled {
            db.put_question(&make_question(pid, 1, 2, 1)).unwrap();
        }
        pids.sort();
        pids
    }

    fn base_query() -> PracticeQuery {
        PracticeQuery {
            course: 1,
            subject: 2,
            qtype: -1,
            sort_column: SortColumn::Pid,
            order: SortOrder::Asc,
            next_pid: None,
            prev_pid: None,
            index: 0,
        }
    }

    #[test]
    fn test_first_page_of_twelve() {
        let (db, _tmp) = setup_db();
        let pids = seed(&db, 12);

        let page = practice_page(&db, &base_query()).unwrap();
        assert_eq!(page.sequence, pids);
        assert_eq!(page.questions.len(), 10);
        assert_eq!(page.questions[0].index, 1);
        assert_eq!(page.questions[9].index, 10);
        assert_eq!(page.next_pid.as_deref(), Some("q10"));
        assert!(page.prev_pid.is_none());
        assert_eq!(page.stat.total_questions, 12);
    }

    #[test]
    fn test_next_cursor_continues_without_overlap() {
        let (db, _tmp) = setup_db();
        seed(&db, 12);

        let first = practice_page(&db, &base_query()).unwrap();
        let mut query = base_query();
        query.next_pid = first.next_pid.clone();

        let second = practice_page(&db, &query).unwrap();
        assert_eq!(second.questions.len(), 2);
        assert_eq!(second.questions[0].question.pid, "q11");
        assert_eq!(second.questions[0].index, 11);
        assert!(second.next_pid.is_none());
        assert_eq!(second.prev_pid.as_deref(), Some("q11"));
    }

    #[test]
    fn test_prev_cursor_pages_back() {
        let (db, _tmp) = setup_db();
        seed(&db, 12);

        let mut query = base_query();
        query.prev_pid = Some("q11".to_string());
        let page = practice_page(&db, &query).unwrap();
        assert_eq!(page.questions[0].question.pid, "q01");
        assert_eq!(page.questions.len(), 10);
        assert!(page.prev_pid.is_none());
        assert_eq!(page.next_pid.as_deref(), Some("q10"));
    }

    #[test]
    fn test_index_start_mid_sequence() {
        let (db, _tmp) = setup_db();
        seed(&db, 12);

        let mut query = base_query();
        query.index = 5;
        let page = practice_page(&db, &query).unwrap();
        assert_eq!(page.questions.len(), 7);
        assert_eq!(page.questions[0].question.pid, "q06");
        assert_eq!(page.questions[0].index, 6);
        assert!(page.next_pid.is_none());
        assert_eq!(page.prev_pid.as_deref(), Some("q06"));
    }

    #[test]
    fn test_stale_cursor_yields_empty_page() {
        let (db, _tmp) = setup_db();
        let pids = seed(&db, 12);

        let mut query = base_query();
        query.next_pid = Some("gone".to_string());
        let page = practice_page(&db, &query).unwrap();
        assert!(page.questions.is_empty());
        assert!(page.next_pid.is_none());
        assert!(page.prev_pid.is_none());
        // The sequence still ships so the client can restart by index
        assert_eq!(page.sequence, pids);
        assert_eq!(page.stat.total_questions, 12);
    }

    #[test]
    fn test_cursor_at_end_of_sequence() {
        let (db, _tmp) = setup_db();
        seed(&db, 12);

        let mut query = base_query();
        query.next_pid = Some("q12".to_string());
        let page = practice_page(&db, &query).unwrap();
        assert!(page.questions.is_empty());
        assert!(page.next_pid.is_none());
        assert!(page.prev_pid.is_none());
    }

    #[test]
    fn test_index_past_end_clamps() {
        let (db, _tmp) = setup_db();
        seed(&db, 5);

        let mut query = base_query();
        query.index = 99;
        let page = practice_page(&db, &query).unwrap();
        assert!(page.questions.is_empty());
        assert!(page.next_pid.is_none());
        // Clamped offset still sits past the start
        assert!(page.prev_pid.is_none());
    }

    #[test]
    fn test_crawl_count_descending_sort() {
        let (db, _tmp) = setup_db();
        for (pid, count) in [("a", 1u32), ("b", 5), ("c", 3)] {
            let mut q = make_question(pid, 1, 2, 1);
            q.crawl_count = count;
            db.put_question(&q).unwrap();
        }

        let mut query = base_query();
        query.sort_column = SortColumn::CrawlCount;
        query.order = SortOrder::Desc;
        let page = practice_page(&db, &query).unwrap();
        assert_eq!(page.sequence, ["b", "c", "a"]);
    }

    #[test]
    fn test_sort_column_fallback() {
        assert_eq!(SortColumn::from_param("content"), SortColumn::Pid);
        assert_eq!(SortColumn::from_param("crawl_count"), SortColumn::CrawlCount);
        assert_eq!(SortOrder::from_param("DESC"), SortOrder::Desc);
        assert_eq!(SortOrder::from_param("whatever"), SortOrder::Asc);
    }
}
