//! Provenance ledger (sharing_tracking)
//!
//! Sole source of truth for what has been replicated where: one row per
//! (source item, target department, kind), mapping to the id of the
//! materialized copy. Kept in a single table rather than inferred from
//! source_department_id columns because courses carry no such column and
//! recipient enumeration must not scan every payload table.

use crp_common::{ArtifactKind, Result};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// One ledger row
#[derive(Debug, Clone)]
pub struct ProvenanceEntry {
    pub source_department_id: i64,
    pub target_department_id: i64,
    pub item_type: ArtifactKind,
    pub source_item_id: i64,
    pub copied_item_id: i64,
}

/// Upsert on the natural key; concurrent shares of the same item to the
/// same target serialize here.
pub async fn record(
    pool: &SqlitePool,
    source_department_id: i64,
    target_department_id: i64,
    kind: ArtifactKind,
    source_item_id: i64,
    copied_item_id: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sharing_tracking
            (source_department_id, target_department_id, item_type, source_item_id, copied_item_id)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(source_department_id, target_department_id, item_type, source_item_id)
            DO UPDATE SET copied_item_id = excluded.copied_item_id
        "#,
    )
    .bind(source_department_id)
    .bind(target_department_id)
    .bind(kind.as_str())
    .bind(source_item_id)
    .bind(copied_item_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// All recipients of a source item: (target department, copied item id)
pub async fn targets_of(
    pool: &SqlitePool,
    source_department_id: i64,
    kind: ArtifactKind,
    source_item_id: i64,
) -> Result<Vec<(i64, i64)>> {
    let rows = sqlx::query(
        "SELECT target_department_id, copied_item_id FROM sharing_tracking
         WHERE source_department_id = ? AND item_type = ? AND source_item_id = ?
         ORDER BY target_department_id",
    )
    .bind(source_department_id)
    .bind(kind.as_str())
    .bind(source_item_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| (r.get("target_department_id"), r.get("copied_item_id")))
        .collect())
}

/// Ledger row that produced a given copy, if any
pub async fn find_by_copy(
    pool: &SqlitePool,
    kind: ArtifactKind,
    copied_item_id: i64,
) -> Result<Option<ProvenanceEntry>> {
    let row = sqlx::query(
        "SELECT source_department_id, target_department_id, item_type, source_item_id, copied_item_id
         FROM sharing_tracking WHERE item_type = ? AND copied_item_id = ? LIMIT 1",
    )
    .bind(kind.as_str())
    .bind(copied_item_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => {
            let item_type: String = r.get("item_type");
            Ok(Some(ProvenanceEntry {
                source_department_id: r.get("source_department_id"),
                target_department_id: r.get("target_department_id"),
                item_type: ArtifactKind::from_str(&item_type)?,
                source_item_id: r.get("source_item_id"),
                copied_item_id: r.get("copied_item_id"),
            }))
        }
        None => Ok(None),
    }
}

/// Bulk delete after a full unshare cascade
pub async fn forget(
    pool: &SqlitePool,
    source_department_id: i64,
    kind: ArtifactKind,
    source_item_id: i64,
) -> Result<()> {
    sqlx::query(
        "DELETE FROM sharing_tracking
         WHERE source_department_id = ? AND item_type = ? AND source_item_id = ?",
    )
    .bind(source_department_id)
    .bind(kind.as_str())
    .bind(source_item_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Drop the ledger row for a single recipient
pub async fn forget_target(
    pool: &SqlitePool,
    source_department_id: i64,
    target_department_id: i64,
    kind: ArtifactKind,
    source_item_id: i64,
) -> Result<()> {
    sqlx::query(
        "DELETE FROM sharing_tracking
         WHERE source_department_id = ? AND target_department_id = ?
           AND item_type = ? AND source_item_id = ?",
    )
    .bind(source_department_id)
    .bind(target_department_id)
    .bind(kind.as_str())
    .bind(source_item_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Drop any ledger rows pointing at a copy that has just been deleted.
/// Used for courses carried along by a semester cascade.
pub async fn forget_copy(
    pool: &SqlitePool,
    target_department_id: i64,
    kind: ArtifactKind,
    copied_item_id: i64,
) -> Result<()> {
    sqlx::query(
        "DELETE FROM sharing_tracking
         WHERE target_department_id = ? AND item_type = ? AND copied_item_id = ?",
    )
    .bind(target_department_id)
    .bind(kind.as_str())
    .bind(copied_item_id)
    .execute(pool)
    .await?;
    Ok(())
}
