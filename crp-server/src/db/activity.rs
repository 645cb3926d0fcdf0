//! Activity log persistence

use crp_common::Result;
use sqlx::SqlitePool;

/// Append one changelog row
pub async fn insert(
    pool: &SqlitePool,
    regulation_id: i64,
    action: &str,
    description: &str,
    changed_by: &str,
    diff_json: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO activity_log (regulation_id, action, description, changed_by, diff_json)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(regulation_id)
    .bind(action)
    .bind(description)
    .bind(changed_by)
    .bind(diff_json)
    .execute(pool)
    .await?;
    Ok(())
}
