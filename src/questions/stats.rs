//! Repository-wide question counts, grouped the way the practice UI
//! presents them: fixed general-education subjects plus whatever
//! professional lessons have crawling credentials configured.

use serde::Serialize;

use crate::config::ExamConfig;
use crate::storage::{Database, DatabaseError};

const CULTURAL_SUBJECTS: [(i32, &str, &str); 4] = [
    (1, "chinese", "语文"),
    (2, "math", "数学"),
    (3, "english", "英语"),
    (4, "politics", "政治"),
];

#[derive(Debug, Clone, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub qtype: i32,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonStat {
    pub subject: i32,
    pub id: String,
    pub name: String,
    pub count: u64,
    pub question_types: Vec<TypeCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamInfo {
    pub exam_time: String,
    pub exam_trust: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionStats {
    pub cultural_lesson: Vec<LessonStat>,
    pub profession_lesson: Vec<LessonStat>,
    pub exam_info: ExamInfo,
    pub version: String,
}

pub fn question_stats(db: &Database, exam: &ExamConfig) -> Result<QuestionStats, DatabaseError> {
    let mut cultural_lesson = Vec::with_capacity(CULTURAL_SUBJECTS.len());
    for (subject, id, name) in CULTURAL_SUBJECTS {
        cultural_lesson.push(lesson_stat(db, 1, subject, id.to_string(), name.to_string())?);
    }

    let mut profession_lesson = Vec::new();
    for info in db.list_request_info(2)? {
        profession_lesson.push(lesson_stat(
            db,
            2,
            info.subject,
            info.profession_id.unwrap_or_default(),
            info.profession_name.unwrap_or_default(),
        )?);
    }

    Ok(QuestionStats {
        cultural_lesson,
        profession_lesson,
        exam_info: ExamInfo {
            exam_time: exam.exam_time.clone(),
            exam_trust: exam.exam_trust,
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn lesson_stat(
    db: &Database,
    course: i32,
    subject: i32,
    id: String,
    name: String,
) -> Result<LessonStat, DatabaseError> {
    let question_types = db
        .question_type_counts(course, subject)?
        .into_iter()
        .map(|(qtype, count)| TypeCount { qtype, count })
        .collect();
    Ok(LessonStat {
        subject,
        id,
        name,
        count: db.count_questions(course, subject)?,
        question_types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::RequestInfo;
    use crate::testutil::{make_question, setup_db, test_config};

    #[test]
    fn test_counts_grouped_by_subject_and_type() {
        let (db, _tmp) = setup_db();
        db.put_question(&make_question("a", 1, 2, 1)).unwrap();
        db.put_question(&make_question("b", 1, 2, 1)).unwrap();
        db.put_question(&make_question("c", 1, 2, 3)).unwrap();
        db.put_question(&make_question("d", 1, 1, 1)).unwrap();

        let stats = question_stats(&db, &test_config().exam).unwrap();
        assert_eq!(stats.cultural_lesson.len(), 4);

        let math = &stats.cultural_lesson[1];
        assert_eq!(math.id, "math");
        assert_eq!(math.count, 3);
        assert_eq!(math.question_types.len(), 2);
        assert_eq!(math.question_types[0].qtype, 1);
        assert_eq!(math.question_types[0].count, 2);

        let chinese = &stats.cultural_lesson[0];
        assert_eq!(chinese.count, 1);
    }

    #[test]
    fn test_profession_lessons_follow_request_info() {
        let (db, _tmp) = setup_db();
        db.put_request_info(&RequestInfo {
            course: 2,
            id_number: String::new(),
            profession_id: Some("fine-arts".to_string()),
            profession_name: Some("美术".to_string()),
            subject: 21,
            uuid: uuid::Uuid::new_v4().to_string(),
        })
        .unwrap();
        db.put_question(&make_question("p", 2, 21, 2)).unwrap();

        let stats = question_stats(&db, &test_config().exam).unwrap();
        assert_eq!(stats.profession_lesson.len(), 1);
        assert_eq!(stats.profession_lesson[0].name, "美术");
        assert_eq!(stats.profession_lesson[0].count, 1);
    }
}
