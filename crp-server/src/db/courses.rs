//! Course and curriculum-link queries
//!
//! course_code is the correlation key when a course is replicated across
//! regulations: if the target regulation already holds a course with the
//! same code, that row is adopted instead of cloned. Different code means
//! a different course, regardless of name similarity.

use crp_common::{Result, Visibility};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// A course row
#[derive(Debug, Clone)]
pub struct Course {
    pub course_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub course_type: Option<String>,
    pub category: Option<String>,
    pub credit: i64,
    pub lecture_hours: i64,
    pub tutorial_hours: i64,
    pub practical_hours: i64,
    pub cia_marks: i64,
    pub see_marks: i64,
    pub total_marks: i64,
    pub visibility: Visibility,
}

impl Course {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self> {
        let visibility: String = row.get("visibility");
        Ok(Course {
            course_id: row.get("course_id"),
            course_code: row.get("course_code"),
            course_name: row.get("course_name"),
            course_type: row.get("course_type"),
            category: row.get("category"),
            credit: row.get("credit"),
            lecture_hours: row.get("lecture_hours"),
            tutorial_hours: row.get("tutorial_hours"),
            practical_hours: row.get("practical_hours"),
            cia_marks: row.get("cia_marks"),
            see_marks: row.get("see_marks"),
            total_marks: row.get("total_marks"),
            visibility: Visibility::from_str(&visibility)?,
        })
    }
}

const COLUMNS: &str = "course_id, course_code, course_name, course_type, category, credit, \
     lecture_hours, tutorial_hours, practical_hours, cia_marks, see_marks, total_marks, visibility";

/// Single course by id
pub async fn fetch_by_id(pool: &SqlitePool, course_id: i64) -> Result<Option<Course>> {
    let row = sqlx::query(&format!("SELECT {} FROM courses WHERE course_id = ?", COLUMNS))
        .bind(course_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(Course::from_row).transpose()
}

/// Course with the given code reachable in a regulation's curriculum
pub async fn find_by_code_in_regulation(
    pool: &SqlitePool,
    course_code: &str,
    regulation_id: i64,
) -> Result<Option<Course>> {
    let row = sqlx::query(
        r#"
        SELECT c.course_id, c.course_code, c.course_name, c.course_type, c.category,
               c.credit, c.lecture_hours, c.tutorial_hours, c.practical_hours,
               c.cia_marks, c.see_marks, c.total_marks, c.visibility
        FROM courses c
        JOIN curriculum_courses cc ON cc.course_id = c.course_id
        WHERE c.course_code = ? AND cc.regulation_id = ?
        ORDER BY cc.id LIMIT 1
        "#,
    )
    .bind(course_code)
    .bind(regulation_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(Course::from_row).transpose()
}

/// Insert a new course record
pub async fn insert(pool: &SqlitePool, course: &Course) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO courses
            (course_code, course_name, course_type, category, credit,
             lecture_hours, tutorial_hours, practical_hours,
             cia_marks, see_marks, total_marks, visibility)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&course.course_code)
    .bind(&course.course_name)
    .bind(&course.course_type)
    .bind(&course.category)
    .bind(course.credit)
    .bind(course.lecture_hours)
    .bind(course.tutorial_hours)
    .bind(course.practical_hours)
    .bind(course.cia_marks)
    .bind(course.see_marks)
    .bind(course.total_marks)
    .bind(course.visibility.as_str())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Adopt an existing course of the target regulation by code, or clone
/// the source's scalar columns into a fresh CLUSTER-visible record.
///
/// Returns the target course id and whether a fresh clone was created
/// (false means an existing record was adopted).
pub async fn adopt_or_clone(
    pool: &SqlitePool,
    source: &Course,
    target_regulation_id: i64,
) -> Result<(i64, bool)> {
    if let Some(existing) =
        find_by_code_in_regulation(pool, &source.course_code, target_regulation_id).await?
    {
        return Ok((existing.course_id, false));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO courses
            (course_code, course_name, course_type, category, credit,
             lecture_hours, tutorial_hours, practical_hours,
             cia_marks, see_marks, total_marks, visibility)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'CLUSTER')
        "#,
    )
    .bind(&source.course_code)
    .bind(&source.course_name)
    .bind(&source.course_type)
    .bind(&source.category)
    .bind(source.credit)
    .bind(source.lecture_hours)
    .bind(source.tutorial_hours)
    .bind(source.practical_hours)
    .bind(source.cia_marks)
    .bind(source.see_marks)
    .bind(source.total_marks)
    .execute(pool)
    .await?;

    Ok((result.last_insert_rowid(), true))
}

/// Set the visibility of a course
pub async fn set_visibility(pool: &SqlitePool, course_id: i64, visibility: Visibility) -> Result<()> {
    sqlx::query("UPDATE courses SET visibility = ? WHERE course_id = ?")
        .bind(visibility.as_str())
        .bind(course_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a course row
pub async fn delete(pool: &SqlitePool, course_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM courses WHERE course_id = ?")
        .bind(course_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Bind a course into a semester of a regulation (idempotent on the triple)
pub async fn link_course_to_semester(
    pool: &SqlitePool,
    regulation_id: i64,
    semester_id: i64,
    course_id: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO curriculum_courses (regulation_id, semester_id, course_id)
        VALUES (?, ?, ?)
        ON CONFLICT(regulation_id, semester_id, course_id) DO NOTHING
        "#,
    )
    .bind(regulation_id)
    .bind(semester_id)
    .bind(course_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// All courses linked into a semester, in link order
pub async fn courses_in_semester(pool: &SqlitePool, semester_id: i64) -> Result<Vec<Course>> {
    let rows = sqlx::query(
        r#"
        SELECT c.course_id, c.course_code, c.course_name, c.course_type, c.category,
               c.credit, c.lecture_hours, c.tutorial_hours, c.practical_hours,
               c.cia_marks, c.see_marks, c.total_marks, c.visibility
        FROM courses c
        JOIN curriculum_courses cc ON cc.course_id = c.course_id
        WHERE cc.semester_id = ?
        ORDER BY cc.id
        "#,
    )
    .bind(semester_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(Course::from_row).collect()
}

/// First curriculum link of a course under a given regulation.
/// Course ownership is transitive through this semester.
pub async fn semester_of_course(
    pool: &SqlitePool,
    course_id: i64,
    regulation_id: i64,
) -> Result<Option<i64>> {
    let semester_id: Option<i64> = sqlx::query_scalar(
        "SELECT semester_id FROM curriculum_courses
         WHERE course_id = ? AND regulation_id = ? ORDER BY id LIMIT 1",
    )
    .bind(course_id)
    .bind(regulation_id)
    .fetch_optional(pool)
    .await?;
    Ok(semester_id)
}

/// First curriculum link of a course across all regulations
pub async fn first_link_of_course(pool: &SqlitePool, course_id: i64) -> Result<Option<(i64, i64)>> {
    let row = sqlx::query(
        "SELECT regulation_id, semester_id FROM curriculum_courses
         WHERE course_id = ? ORDER BY id LIMIT 1",
    )
    .bind(course_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| (r.get("regulation_id"), r.get("semester_id"))))
}

/// Remove every curriculum link referring to a course
pub async fn unlink_course_everywhere(pool: &SqlitePool, course_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM curriculum_courses WHERE course_id = ?")
        .bind(course_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove every curriculum link belonging to a semester
pub async fn unlink_semester(pool: &SqlitePool, semester_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM curriculum_courses WHERE semester_id = ?")
        .bind(semester_id)
        .execute(pool)
        .await?;
    Ok(())
}
