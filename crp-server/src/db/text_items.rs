//! Ordered text-list items (mission, PEOs, POs, PSOs)
//!
//! One logical entity over four physical tables; every query takes the
//! `ArtifactKind` and resolves the table through it. Only text kinds are
//! accepted here.

use crp_common::{ArtifactKind, Error, Result, Visibility};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// A row of one of the four text-list tables
#[derive(Debug, Clone)]
pub struct TextItem {
    pub id: i64,
    pub department_id: i64,
    pub text: String,
    pub position: i64,
    pub visibility: Visibility,
    pub source_department_id: Option<i64>,
}

impl TextItem {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self> {
        let visibility: String = row.get("visibility");
        Ok(TextItem {
            id: row.get("id"),
            department_id: row.get("department_id"),
            text: row.get("text"),
            position: row.get("position"),
            visibility: Visibility::from_str(&visibility)?,
            source_department_id: row.get("source_department_id"),
        })
    }
}

fn table(kind: ArtifactKind) -> Result<&'static str> {
    if !kind.is_text() {
        return Err(Error::InvalidInput(format!(
            "{} is not a text item kind",
            kind
        )));
    }
    Ok(kind.table_name())
}

/// All items of a department, ordered by position
pub async fn fetch_by_department(
    pool: &SqlitePool,
    kind: ArtifactKind,
    department_id: i64,
) -> Result<Vec<TextItem>> {
    let rows = sqlx::query(&format!(
        "SELECT id, department_id, text, position, visibility, source_department_id
         FROM {} WHERE department_id = ? ORDER BY position, id",
        table(kind)?
    ))
    .bind(department_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(TextItem::from_row).collect()
}

/// Single item by id
pub async fn fetch_by_id(
    pool: &SqlitePool,
    kind: ArtifactKind,
    id: i64,
) -> Result<Option<TextItem>> {
    let row = sqlx::query(&format!(
        "SELECT id, department_id, text, position, visibility, source_department_id
         FROM {} WHERE id = ?",
        table(kind)?
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(TextItem::from_row).transpose()
}

/// Insert an owner-created item (always UNIQUE)
pub async fn insert(
    pool: &SqlitePool,
    kind: ArtifactKind,
    department_id: i64,
    text: &str,
    position: i64,
) -> Result<i64> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (department_id, text, position, visibility) VALUES (?, ?, ?, 'UNIQUE')",
        table(kind)?
    ))
    .bind(department_id)
    .bind(text)
    .bind(position)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Materialize a replica row in a peer department
pub async fn insert_copy(
    pool: &SqlitePool,
    kind: ArtifactKind,
    target_department_id: i64,
    text: &str,
    position: i64,
    source_department_id: i64,
) -> Result<i64> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (department_id, text, position, visibility, source_department_id)
         VALUES (?, ?, ?, 'CLUSTER', ?)",
        table(kind)?
    ))
    .bind(target_department_id)
    .bind(text)
    .bind(position)
    .bind(source_department_id)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Existing replica of the same source text in the target department, if any.
/// Used by the adopt-never-duplicate rule during share.
pub async fn find_matching_copy(
    pool: &SqlitePool,
    kind: ArtifactKind,
    target_department_id: i64,
    source_department_id: i64,
    text: &str,
) -> Result<Option<TextItem>> {
    let row = sqlx::query(&format!(
        "SELECT id, department_id, text, position, visibility, source_department_id
         FROM {} WHERE department_id = ? AND source_department_id = ? AND text = ?",
        table(kind)?
    ))
    .bind(target_department_id)
    .bind(source_department_id)
    .bind(text)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(TextItem::from_row).transpose()
}

/// Update the text of an item
pub async fn update_text(pool: &SqlitePool, kind: ArtifactKind, id: i64, text: &str) -> Result<()> {
    sqlx::query(&format!("UPDATE {} SET text = ? WHERE id = ?", table(kind)?))
        .bind(text)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Set the visibility of an item
pub async fn set_visibility(
    pool: &SqlitePool,
    kind: ArtifactKind,
    id: i64,
    visibility: Visibility,
) -> Result<()> {
    sqlx::query(&format!(
        "UPDATE {} SET visibility = ? WHERE id = ?",
        table(kind)?
    ))
    .bind(visibility.as_str())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete an item row
pub async fn delete(pool: &SqlitePool, kind: ArtifactKind, id: i64) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table(kind)?))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
