//! Database initialization tests: file creation, idempotent schema,
//! and the sharing-ledger natural key.

use crp_common::db::{create_all_tables, init_database};
use sqlx::SqlitePool;
use std::path::PathBuf;

#[tokio::test]
async fn creates_database_file_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path: PathBuf = dir.path().join("portal.db");

    assert!(!db_path.exists());
    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists(), "database file was not created");

    // Opening again must succeed without re-creating anything
    drop(pool);
    init_database(&db_path).await.unwrap();
}

#[tokio::test]
async fn schema_creation_is_idempotent() {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    create_all_tables(&pool).await.unwrap();
    create_all_tables(&pool).await.unwrap();

    for table in [
        "regulations",
        "department_overview",
        "clusters",
        "cluster_departments",
        "department_mission",
        "department_peos",
        "department_pos",
        "department_psos",
        "semesters",
        "courses",
        "curriculum_courses",
        "course_syllabus",
        "syllabus_models",
        "syllabus_titles",
        "syllabus_topics",
        "co_po_mappings",
        "co_pso_mappings",
        "peo_po_mappings",
        "sharing_tracking",
        "activity_log",
    ] {
        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(found, 1, "table {} missing", table);
    }
}

#[tokio::test]
async fn sharing_ledger_enforces_natural_key() {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    create_all_tables(&pool).await.unwrap();

    let insert = "INSERT INTO sharing_tracking
        (source_department_id, target_department_id, item_type, source_item_id, copied_item_id)
        VALUES (?, ?, ?, ?, ?)";

    sqlx::query(insert)
        .bind(1i64).bind(2i64).bind("mission").bind(10i64).bind(20i64)
        .execute(&pool)
        .await
        .unwrap();

    // Same (source, target, type, item) must not insert twice
    let duplicate = sqlx::query(insert)
        .bind(1i64).bind(2i64).bind("mission").bind(10i64).bind(21i64)
        .execute(&pool)
        .await;
    assert!(duplicate.is_err());

    // A different target is a distinct ledger row
    sqlx::query(insert)
        .bind(1i64).bind(3i64).bind("mission").bind(10i64).bind(22i64)
        .execute(&pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn cluster_membership_is_single_valued() {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    create_all_tables(&pool).await.unwrap();

    // Membership references a real department row
    sqlx::query(
        "INSERT INTO regulations (name, academic_year, max_credits) VALUES ('CSE 2022', '2022-2023', 160)",
    )
    .execute(&pool)
    .await
    .unwrap();
    let department_id = sqlx::query(
        "INSERT INTO department_overview (regulation_id, vision) VALUES (1, 'v')",
    )
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();

    sqlx::query("INSERT INTO clusters (name) VALUES ('A'), ('B')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO cluster_departments (cluster_id, department_id) VALUES (1, ?)")
        .bind(department_id)
        .execute(&pool)
        .await
        .unwrap();

    let second = sqlx::query("INSERT INTO cluster_departments (cluster_id, department_id) VALUES (2, ?)")
        .bind(department_id)
        .execute(&pool)
        .await;
    assert!(second.is_err(), "a department joined two clusters");
}
