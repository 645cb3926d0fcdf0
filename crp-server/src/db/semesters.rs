//! Semester queries
//!
//! semester_number is the cross-department correlation key: a shared
//! semester lands in the peer regulation under the same number.

use crp_common::{Result, Visibility};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// A semester row
#[derive(Debug, Clone)]
pub struct Semester {
    pub id: i64,
    pub regulation_id: i64,
    pub semester_number: Option<i64>,
    pub card_type: String,
    pub visibility: Visibility,
    pub source_department_id: Option<i64>,
}

impl Semester {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self> {
        let visibility: String = row.get("visibility");
        Ok(Semester {
            id: row.get("id"),
            regulation_id: row.get("regulation_id"),
            semester_number: row.get("semester_number"),
            card_type: row.get("card_type"),
            visibility: Visibility::from_str(&visibility)?,
            source_department_id: row.get("source_department_id"),
        })
    }
}

const COLUMNS: &str =
    "id, regulation_id, semester_number, card_type, visibility, source_department_id";

/// Single semester by id
pub async fn fetch_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Semester>> {
    let row = sqlx::query(&format!("SELECT {} FROM semesters WHERE id = ?", COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(Semester::from_row).transpose()
}

/// All semesters of a regulation, ordered by number
pub async fn fetch_by_regulation(pool: &SqlitePool, regulation_id: i64) -> Result<Vec<Semester>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM semesters WHERE regulation_id = ? ORDER BY semester_number, id",
        COLUMNS
    ))
    .bind(regulation_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(Semester::from_row).collect()
}

/// Any semester of the regulation with the given number (owned or received)
pub async fn find_by_number(
    pool: &SqlitePool,
    regulation_id: i64,
    semester_number: i64,
) -> Result<Option<Semester>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM semesters WHERE regulation_id = ? AND semester_number = ? ORDER BY id LIMIT 1",
        COLUMNS
    ))
    .bind(regulation_id)
    .bind(semester_number)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(Semester::from_row).transpose()
}

/// An existing replica of a given source department's semester in the
/// target regulation, keyed by semester number
pub async fn find_copy_by_number(
    pool: &SqlitePool,
    regulation_id: i64,
    semester_number: i64,
    source_department_id: i64,
) -> Result<Option<Semester>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM semesters
         WHERE regulation_id = ? AND semester_number = ? AND source_department_id = ?",
        COLUMNS
    ))
    .bind(regulation_id)
    .bind(semester_number)
    .bind(source_department_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(Semester::from_row).transpose()
}

/// Insert an owner-created semester (always UNIQUE)
pub async fn insert(
    pool: &SqlitePool,
    regulation_id: i64,
    semester_number: Option<i64>,
    card_type: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO semesters (regulation_id, semester_number, card_type, visibility)
         VALUES (?, ?, ?, 'UNIQUE')",
    )
    .bind(regulation_id)
    .bind(semester_number)
    .bind(card_type)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Materialize a replica semester in a peer regulation
pub async fn insert_copy(
    pool: &SqlitePool,
    regulation_id: i64,
    semester_number: i64,
    card_type: &str,
    source_department_id: i64,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO semesters (regulation_id, semester_number, card_type, visibility, source_department_id)
         VALUES (?, ?, ?, 'CLUSTER', ?)",
    )
    .bind(regulation_id)
    .bind(semester_number)
    .bind(card_type)
    .bind(source_department_id)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Set the visibility of a semester
pub async fn set_visibility(pool: &SqlitePool, id: i64, visibility: Visibility) -> Result<()> {
    sqlx::query("UPDATE semesters SET visibility = ? WHERE id = ?")
        .bind(visibility.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a semester row
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM semesters WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
