//! Cluster topology queries
//!
//! A cluster is the set of departments allowed to share artifacts with one
//! another. Membership is exclusive: the unique key on
//! cluster_departments.department_id rejects a second membership.

use crp_common::Result;
use sqlx::{Row, SqlitePool};

/// A department reachable through the caller's cluster
#[derive(Debug, Clone)]
pub struct Peer {
    pub department_id: i64,
    pub regulation_id: i64,
    pub name: String,
}

/// Cluster identity as seen from a member department
#[derive(Debug, Clone)]
pub struct ClusterInfo {
    pub id: i64,
    pub name: String,
}

/// Create a cluster
pub async fn create_cluster(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO clusters (name, description) VALUES (?, ?)")
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Add a department to a cluster
///
/// Fails with a unique-key violation if the department already belongs to
/// any cluster.
pub async fn add_department(pool: &SqlitePool, cluster_id: i64, department_id: i64) -> Result<()> {
    sqlx::query("INSERT INTO cluster_departments (cluster_id, department_id) VALUES (?, ?)")
        .bind(cluster_id)
        .bind(department_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Cluster by id
pub async fn fetch_by_id(pool: &SqlitePool, cluster_id: i64) -> Result<Option<ClusterInfo>> {
    let row = sqlx::query("SELECT id, name FROM clusters WHERE id = ?")
        .bind(cluster_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| ClusterInfo {
        id: r.get("id"),
        name: r.get("name"),
    }))
}

/// Cluster a department belongs to, if any
pub async fn cluster_of(pool: &SqlitePool, department_id: i64) -> Result<Option<ClusterInfo>> {
    let row = sqlx::query(
        r#"
        SELECT c.id, c.name
        FROM clusters c
        JOIN cluster_departments cd ON cd.cluster_id = c.id
        WHERE cd.department_id = ?
        "#,
    )
    .bind(department_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| ClusterInfo {
        id: r.get("id"),
        name: r.get("name"),
    }))
}

/// Peer departments of the given department (same cluster, excluding self)
pub async fn peers_of(pool: &SqlitePool, department_id: i64) -> Result<Vec<Peer>> {
    let rows = sqlx::query(
        r#"
        SELECT d.id AS department_id, d.regulation_id, r.name
        FROM cluster_departments me
        JOIN cluster_departments cd ON cd.cluster_id = me.cluster_id
        JOIN department_overview d ON d.id = cd.department_id
        JOIN regulations r ON r.id = d.regulation_id
        WHERE me.department_id = ? AND cd.department_id != ?
        ORDER BY d.id
        "#,
    )
    .bind(department_id)
    .bind(department_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Peer {
            department_id: r.get("department_id"),
            regulation_id: r.get("regulation_id"),
            name: r.get("name"),
        })
        .collect())
}

/// All member departments of a cluster
pub async fn members_of(pool: &SqlitePool, cluster_id: i64) -> Result<Vec<Peer>> {
    let rows = sqlx::query(
        r#"
        SELECT d.id AS department_id, d.regulation_id, r.name
        FROM cluster_departments cd
        JOIN department_overview d ON d.id = cd.department_id
        JOIN regulations r ON r.id = d.regulation_id
        WHERE cd.cluster_id = ?
        ORDER BY d.id
        "#,
    )
    .bind(cluster_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Peer {
            department_id: r.get("department_id"),
            regulation_id: r.get("regulation_id"),
            name: r.get("name"),
        })
        .collect())
}

/// True when both departments are members of the same cluster
pub async fn is_peer(pool: &SqlitePool, a: i64, b: i64) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM cluster_departments x
        JOIN cluster_departments y ON x.cluster_id = y.cluster_id
        WHERE x.department_id = ? AND y.department_id = ?
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}
