//! Competency mapping matrices (CO-PO, CO-PSO, PEO-PO)

use crp_common::Result;
use sqlx::{Row, SqlitePool};

/// One cell of a mapping matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingCell {
    pub row_index: i64,
    pub col_index: i64,
    pub value: i64,
}

/// Upsert one PEO-PO cell for a regulation
pub async fn set_peo_po_value(
    pool: &SqlitePool,
    regulation_id: i64,
    peo_index: i64,
    po_index: i64,
    value: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO peo_po_mappings (regulation_id, peo_index, po_index, value)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(regulation_id, peo_index, po_index) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(regulation_id)
    .bind(peo_index)
    .bind(po_index)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Full PEO-PO matrix of a regulation
pub async fn fetch_peo_po(pool: &SqlitePool, regulation_id: i64) -> Result<Vec<MappingCell>> {
    let rows = sqlx::query(
        "SELECT peo_index, po_index, value FROM peo_po_mappings
         WHERE regulation_id = ? ORDER BY peo_index, po_index",
    )
    .bind(regulation_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| MappingCell {
            row_index: r.get("peo_index"),
            col_index: r.get("po_index"),
            value: r.get("value"),
        })
        .collect())
}

/// Drop every CO-PO and CO-PSO row of a course (course deletion chain)
pub async fn delete_course_mappings(pool: &SqlitePool, course_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM co_po_mappings WHERE course_id = ?")
        .bind(course_id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM co_pso_mappings WHERE course_id = ?")
        .bind(course_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace the target regulation's PEO-PO matrix with the source's.
///
/// Wholesale: every existing target row is removed first, even rows the
/// target authored itself.
pub async fn copy_peo_po(pool: &SqlitePool, source_regulation_id: i64, target_regulation_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM peo_po_mappings WHERE regulation_id = ?")
        .bind(target_regulation_id)
        .execute(pool)
        .await?;

    sqlx::query(
        "INSERT INTO peo_po_mappings (regulation_id, peo_index, po_index, value)
         SELECT ?, peo_index, po_index, value FROM peo_po_mappings WHERE regulation_id = ?",
    )
    .bind(target_regulation_id)
    .bind(source_regulation_id)
    .execute(pool)
    .await?;

    Ok(())
}
