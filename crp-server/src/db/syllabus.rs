//! Course syllabus storage: header, flat child lists, and the
//! modules → titles → topics tree.

use crp_common::db::init::SYLLABUS_LIST_TABLES;
use crp_common::Result;
use sqlx::{Row, SqlitePool};

/// Ensure the syllabus header row exists for a course
pub async fn ensure_header(pool: &SqlitePool, course_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO course_syllabus (course_id) VALUES (?)
         ON CONFLICT(course_id) DO NOTHING",
    )
    .bind(course_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Append a row to one of the flat syllabus lists
/// (objectives, outcomes, references, prerequisites, teamwork)
pub async fn insert_list_item(
    pool: &SqlitePool,
    table: &str,
    course_id: i64,
    text: &str,
    position: i64,
) -> Result<i64> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (course_id, text, position) VALUES (?, ?, ?)",
        table
    ))
    .bind(course_id)
    .bind(text)
    .bind(position)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Add a module to a course syllabus
pub async fn insert_model(
    pool: &SqlitePool,
    course_id: i64,
    model_name: &str,
    position: i64,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO syllabus_models (course_id, model_name, position) VALUES (?, ?, ?)",
    )
    .bind(course_id)
    .bind(model_name)
    .bind(position)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Add a title under a module
pub async fn insert_title(
    pool: &SqlitePool,
    model_id: i64,
    title_name: &str,
    hours: i64,
    position: i64,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO syllabus_titles (model_id, title_name, hours, position) VALUES (?, ?, ?, ?)",
    )
    .bind(model_id)
    .bind(title_name)
    .bind(hours)
    .bind(position)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Add a topic under a title
pub async fn insert_topic(
    pool: &SqlitePool,
    title_id: i64,
    topic: &str,
    position: i64,
) -> Result<i64> {
    let result =
        sqlx::query("INSERT INTO syllabus_topics (title_id, topic, position) VALUES (?, ?, ?)")
            .bind(title_id)
            .bind(topic)
            .bind(position)
            .execute(pool)
            .await?;
    Ok(result.last_insert_rowid())
}

/// Deep-copy the whole syllabus of one course onto another, preserving
/// positions.
///
/// The tree is walked one level at a time (modules, then each module's
/// titles, then each title's topics) so every child can reference the
/// freshly assigned parent id without holding the whole tree in memory.
pub async fn clone_tree(pool: &SqlitePool, source_course_id: i64, target_course_id: i64) -> Result<()> {
    ensure_header(pool, target_course_id).await?;

    for table in SYLLABUS_LIST_TABLES {
        sqlx::query(&format!(
            "INSERT INTO {table} (course_id, text, position)
             SELECT ?, text, position FROM {table} WHERE course_id = ?"
        ))
        .bind(target_course_id)
        .bind(source_course_id)
        .execute(pool)
        .await?;
    }

    let models = sqlx::query(
        "SELECT id, model_name, position FROM syllabus_models
         WHERE course_id = ? ORDER BY position, id",
    )
    .bind(source_course_id)
    .fetch_all(pool)
    .await?;

    for model in &models {
        let source_model_id: i64 = model.get("id");
        let model_name: String = model.get("model_name");
        let position: i64 = model.get("position");
        let new_model_id = insert_model(pool, target_course_id, &model_name, position).await?;

        let titles = sqlx::query(
            "SELECT id, title_name, hours, position FROM syllabus_titles
             WHERE model_id = ? ORDER BY position, id",
        )
        .bind(source_model_id)
        .fetch_all(pool)
        .await?;

        for title in &titles {
            let source_title_id: i64 = title.get("id");
            let title_name: String = title.get("title_name");
            let hours: i64 = title.get("hours");
            let title_position: i64 = title.get("position");
            let new_title_id =
                insert_title(pool, new_model_id, &title_name, hours, title_position).await?;

            sqlx::query(
                "INSERT INTO syllabus_topics (title_id, topic, position)
                 SELECT ?, topic, position FROM syllabus_topics WHERE title_id = ?",
            )
            .bind(new_title_id)
            .bind(source_title_id)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

/// Delete the whole syllabus of a course, children before parents
/// (topics → titles → models → flat lists → header).
pub async fn delete_tree(pool: &SqlitePool, course_id: i64) -> Result<()> {
    sqlx::query(
        "DELETE FROM syllabus_topics WHERE title_id IN (
             SELECT t.id FROM syllabus_titles t
             JOIN syllabus_models m ON m.id = t.model_id
             WHERE m.course_id = ?)",
    )
    .bind(course_id)
    .execute(pool)
    .await?;

    sqlx::query(
        "DELETE FROM syllabus_titles WHERE model_id IN (
             SELECT id FROM syllabus_models WHERE course_id = ?)",
    )
    .bind(course_id)
    .execute(pool)
    .await?;

    sqlx::query("DELETE FROM syllabus_models WHERE course_id = ?")
        .bind(course_id)
        .execute(pool)
        .await?;

    for table in SYLLABUS_LIST_TABLES {
        sqlx::query(&format!("DELETE FROM {} WHERE course_id = ?", table))
            .bind(course_id)
            .execute(pool)
            .await?;
    }

    sqlx::query("DELETE FROM course_syllabus WHERE course_id = ?")
        .bind(course_id)
        .execute(pool)
        .await?;

    Ok(())
}
