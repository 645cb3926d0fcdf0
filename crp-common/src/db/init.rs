//! Database initialization
//!
//! Creates the portal schema on first run. All statements are idempotent
//! (`CREATE TABLE IF NOT EXISTS`) so startup is safe against an existing
//! database. Schema changes happen here, once, at startup — there is no
//! boot-time column backfill.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Replication cascades rely on application-level ordering, but child
    // links still need referential integrity underneath.
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while a share fan-out is writing
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_all_tables(&pool).await?;

    Ok(pool)
}

/// Create every portal table (idempotent, safe to call on every boot)
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_regulations_table(pool).await?;
    create_department_overview_table(pool).await?;
    create_clusters_table(pool).await?;
    create_cluster_departments_table(pool).await?;

    // Ordered text lists (one layout, four physical tables)
    for table in TEXT_LIST_TABLES {
        create_text_list_table(pool, table).await?;
    }

    create_semesters_table(pool).await?;
    create_courses_table(pool).await?;
    create_curriculum_courses_table(pool).await?;

    // Syllabus header, flat child lists, and the modules tree
    create_course_syllabus_table(pool).await?;
    for table in SYLLABUS_LIST_TABLES {
        create_syllabus_list_table(pool, table).await?;
    }
    create_syllabus_models_table(pool).await?;
    create_syllabus_titles_table(pool).await?;
    create_syllabus_topics_table(pool).await?;

    create_co_po_mappings_table(pool).await?;
    create_co_pso_mappings_table(pool).await?;
    create_peo_po_mappings_table(pool).await?;

    create_sharing_tracking_table(pool).await?;
    create_activity_log_table(pool).await?;

    Ok(())
}

/// The four department text-list tables
pub const TEXT_LIST_TABLES: [&str; 4] = [
    "department_mission",
    "department_peos",
    "department_pos",
    "department_psos",
];

/// The five flat syllabus child-list tables
pub const SYLLABUS_LIST_TABLES: [&str; 5] = [
    "syllabus_objectives",
    "syllabus_outcomes",
    "syllabus_references",
    "syllabus_prerequisites",
    "syllabus_teamwork",
];

async fn create_regulations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS regulations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            max_credits INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_department_overview_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS department_overview (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            regulation_id INTEGER NOT NULL UNIQUE REFERENCES regulations(id),
            vision TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_clusters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clusters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Membership is exclusive: the unique key on department_id rejects a
/// second cluster for the same department.
async fn create_cluster_departments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cluster_departments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cluster_id INTEGER NOT NULL REFERENCES clusters(id),
            department_id INTEGER NOT NULL UNIQUE REFERENCES department_overview(id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_text_list_table(pool: &SqlitePool, table: &str) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            department_id INTEGER NOT NULL REFERENCES department_overview(id),
            text TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            visibility TEXT NOT NULL DEFAULT 'UNIQUE',
            source_department_id INTEGER
        )
        "#,
        table
    ))
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_semesters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS semesters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            regulation_id INTEGER NOT NULL REFERENCES regulations(id),
            semester_number INTEGER,
            card_type TEXT NOT NULL DEFAULT 'REGULAR',
            visibility TEXT NOT NULL DEFAULT 'UNIQUE',
            source_department_id INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// course_code is the cross-department correlation key. Uniqueness is
/// per regulation catalog, enforced through the adopt-by-code path during
/// replication; replicas of a shared course reuse the code.
async fn create_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            course_id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_code TEXT NOT NULL,
            course_name TEXT NOT NULL,
            course_type TEXT,
            category TEXT,
            credit INTEGER NOT NULL DEFAULT 0,
            lecture_hours INTEGER NOT NULL DEFAULT 0,
            tutorial_hours INTEGER NOT NULL DEFAULT 0,
            practical_hours INTEGER NOT NULL DEFAULT 0,
            cia_marks INTEGER NOT NULL DEFAULT 0,
            see_marks INTEGER NOT NULL DEFAULT 0,
            total_marks INTEGER NOT NULL DEFAULT 0,
            visibility TEXT NOT NULL DEFAULT 'UNIQUE'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_code ON courses(course_code)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_curriculum_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS curriculum_courses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            regulation_id INTEGER NOT NULL REFERENCES regulations(id),
            semester_id INTEGER NOT NULL REFERENCES semesters(id),
            course_id INTEGER NOT NULL REFERENCES courses(course_id),
            UNIQUE(regulation_id, semester_id, course_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_course_syllabus_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_syllabus (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL UNIQUE REFERENCES courses(course_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_syllabus_list_table(pool: &SqlitePool, table: &str) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL REFERENCES courses(course_id),
            text TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
        table
    ))
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_syllabus_models_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS syllabus_models (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL REFERENCES courses(course_id),
            model_name TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_syllabus_titles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS syllabus_titles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model_id INTEGER NOT NULL REFERENCES syllabus_models(id),
            title_name TEXT NOT NULL,
            hours INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_syllabus_topics_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS syllabus_topics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title_id INTEGER NOT NULL REFERENCES syllabus_titles(id),
            topic TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_co_po_mappings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS co_po_mappings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL REFERENCES courses(course_id),
            co_index INTEGER NOT NULL,
            po_index INTEGER NOT NULL,
            value INTEGER NOT NULL DEFAULT 0,
            UNIQUE(course_id, co_index, po_index)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_co_pso_mappings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS co_pso_mappings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL REFERENCES courses(course_id),
            co_index INTEGER NOT NULL,
            pso_index INTEGER NOT NULL,
            value INTEGER NOT NULL DEFAULT 0,
            UNIQUE(course_id, co_index, pso_index)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_peo_po_mappings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS peo_po_mappings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            regulation_id INTEGER NOT NULL REFERENCES regulations(id),
            peo_index INTEGER NOT NULL,
            po_index INTEGER NOT NULL,
            value INTEGER NOT NULL DEFAULT 0,
            UNIQUE(regulation_id, peo_index, po_index)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Provenance ledger. The natural key serializes concurrent shares of the
/// same source item to the same target.
async fn create_sharing_tracking_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sharing_tracking (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_department_id INTEGER NOT NULL,
            target_department_id INTEGER NOT NULL,
            item_type TEXT NOT NULL,
            source_item_id INTEGER NOT NULL,
            copied_item_id INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(source_department_id, target_department_id, item_type, source_item_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_activity_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activity_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            regulation_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            description TEXT NOT NULL,
            changed_by TEXT NOT NULL DEFAULT 'system',
            diff_json TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
