//! Regulation and department overview queries
//!
//! A department's identity everywhere in the sharing system is the id of
//! its department_overview row; in current usage it is 1:1 with a
//! regulation.

use crp_common::Result;
use sqlx::SqlitePool;

/// Create a regulation (catalog edition root)
pub async fn create_regulation(
    pool: &SqlitePool,
    name: &str,
    academic_year: &str,
    max_credits: i64,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO regulations (name, academic_year, max_credits) VALUES (?, ?, ?)",
    )
    .bind(name)
    .bind(academic_year)
    .bind(max_credits)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Create the department overview for a regulation
pub async fn create_department(pool: &SqlitePool, regulation_id: i64, vision: &str) -> Result<i64> {
    let result =
        sqlx::query("INSERT INTO department_overview (regulation_id, vision) VALUES (?, ?)")
            .bind(regulation_id)
            .bind(vision)
            .execute(pool)
            .await?;
    Ok(result.last_insert_rowid())
}

/// Regulation owned by a department
pub async fn regulation_of(pool: &SqlitePool, department_id: i64) -> Result<Option<i64>> {
    let reg: Option<i64> =
        sqlx::query_scalar("SELECT regulation_id FROM department_overview WHERE id = ?")
            .bind(department_id)
            .fetch_optional(pool)
            .await?;
    Ok(reg)
}

/// Department identified by its regulation
pub async fn department_of_regulation(pool: &SqlitePool, regulation_id: i64) -> Result<Option<i64>> {
    let dept: Option<i64> =
        sqlx::query_scalar("SELECT id FROM department_overview WHERE regulation_id = ?")
            .bind(regulation_id)
            .fetch_optional(pool)
            .await?;
    Ok(dept)
}
