//! Shared test fixtures: in-memory database, three clustered departments,
//! and seeding helpers for courses and syllabus trees.

#![allow(dead_code)]

use crp_common::Visibility;
use crp_server::db::{clusters, courses, departments, semesters, syllabus};
use crp_server::{ActivityLogger, AppState};
use sqlx::SqlitePool;

/// Fresh in-memory database with the full portal schema
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    crp_common::db::create_all_tables(&pool).await.unwrap();
    pool
}

/// Three departments in one cluster:
/// D1 (reg 1) and D2 (reg 2) mirror the common two-party scenarios,
/// D3 (reg 3) exercises selective targeting.
pub struct Fixture {
    pub pool: SqlitePool,
    pub cluster_id: i64,
    pub reg1: i64,
    pub reg2: i64,
    pub reg3: i64,
    pub dept1: i64,
    pub dept2: i64,
    pub dept3: i64,
}

impl Fixture {
    pub fn activity(&self) -> ActivityLogger {
        ActivityLogger::new(self.pool.clone())
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.pool.clone())
    }
}

pub async fn cluster_fixture() -> Fixture {
    let pool = test_pool().await;

    let reg1 = departments::create_regulation(&pool, "CSE 2022", "2022-2023", 160)
        .await
        .unwrap();
    let reg2 = departments::create_regulation(&pool, "ECE 2022", "2022-2023", 160)
        .await
        .unwrap();
    let reg3 = departments::create_regulation(&pool, "MECH 2022", "2022-2023", 160)
        .await
        .unwrap();

    let dept1 = departments::create_department(&pool, reg1, "Vision CSE").await.unwrap();
    let dept2 = departments::create_department(&pool, reg2, "Vision ECE").await.unwrap();
    let dept3 = departments::create_department(&pool, reg3, "Vision MECH").await.unwrap();

    let cluster_id = clusters::create_cluster(&pool, "Engineering", Some("shared core"))
        .await
        .unwrap();
    clusters::add_department(&pool, cluster_id, dept1).await.unwrap();
    clusters::add_department(&pool, cluster_id, dept2).await.unwrap();
    clusters::add_department(&pool, cluster_id, dept3).await.unwrap();

    Fixture {
        pool,
        cluster_id,
        reg1,
        reg2,
        reg3,
        dept1,
        dept2,
        dept3,
    }
}

/// Insert a course with typical scalar values
pub async fn seed_course(pool: &SqlitePool, code: &str, name: &str) -> i64 {
    let course = courses::Course {
        course_id: 0,
        course_code: code.to_string(),
        course_name: name.to_string(),
        course_type: Some("THEORY".to_string()),
        category: Some("PC".to_string()),
        credit: 3,
        lecture_hours: 3,
        tutorial_hours: 0,
        practical_hours: 0,
        cia_marks: 40,
        see_marks: 60,
        total_marks: 100,
        visibility: Visibility::Unique,
    };
    courses::insert(pool, &course).await.unwrap()
}

/// Course linked into a fresh or existing semester of a regulation
pub async fn seed_linked_course(
    pool: &SqlitePool,
    regulation_id: i64,
    semester_id: i64,
    code: &str,
    name: &str,
) -> i64 {
    let course_id = seed_course(pool, code, name).await;
    courses::link_course_to_semester(pool, regulation_id, semester_id, course_id)
        .await
        .unwrap();
    course_id
}

/// Small but fully nested syllabus: one objective, one module with one
/// title and two topics
pub async fn seed_syllabus(pool: &SqlitePool, course_id: i64) {
    syllabus::ensure_header(pool, course_id).await.unwrap();
    syllabus::insert_list_item(pool, "syllabus_objectives", course_id, "Understand basics", 0)
        .await
        .unwrap();
    let model = syllabus::insert_model(pool, course_id, "Module I", 0).await.unwrap();
    let title = syllabus::insert_title(pool, model, "Introduction", 9, 0).await.unwrap();
    syllabus::insert_topic(pool, title, "History", 0).await.unwrap();
    syllabus::insert_topic(pool, title, "Terminology", 1).await.unwrap();
}

pub async fn seed_semester(pool: &SqlitePool, regulation_id: i64, number: i64) -> i64 {
    semesters::insert(pool, regulation_id, Some(number), "REGULAR")
        .await
        .unwrap()
}

/// Row count of an arbitrary table, optionally filtered
pub async fn count(pool: &SqlitePool, table: &str, where_clause: &str) -> i64 {
    let sql = if where_clause.is_empty() {
        format!("SELECT COUNT(*) FROM {}", table)
    } else {
        format!("SELECT COUNT(*) FROM {} WHERE {}", table, where_clause)
    };
    sqlx::query_scalar(&sql).fetch_one(pool).await.unwrap()
}

/// Wait for a detached activity-log append to land
pub async fn wait_for_activity(pool: &SqlitePool, action: &str) -> bool {
    for _ in 0..50 {
        let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_log WHERE action = ?")
            .bind(action)
            .fetch_one(pool)
            .await
            .unwrap();
        if found > 0 {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    false
}
