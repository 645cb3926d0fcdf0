//! Fire-and-forget activity log writer
//!
//! Strictly observational: every append runs on a detached task and any
//! failure is logged and discarded. A sharing operation never waits on the
//! changelog and never fails because of it.

use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use tracing::warn;

use crate::db;

/// Structured field-level diff for a changelog row:
/// field name (or `label[index]`) → `{old, new}`.
#[derive(Debug, Default, Clone)]
pub struct FieldDiff(Map<String, Value>);

impl FieldDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, old: impl Into<Value>, new: impl Into<Value>) {
        self.0
            .insert(field.into(), json!({ "old": old.into(), "new": new.into() }));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

/// Detached changelog writer shared through AppState
#[derive(Clone)]
pub struct ActivityLogger {
    pool: SqlitePool,
}

impl ActivityLogger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a changelog row without blocking the caller.
    ///
    /// The spawned task may outlive the request handler that triggered it.
    pub fn log(
        &self,
        regulation_id: i64,
        action: &str,
        description: String,
        changed_by: &str,
        diff: Option<FieldDiff>,
    ) {
        let pool = self.pool.clone();
        let action = action.to_string();
        let changed_by = changed_by.to_string();
        let diff_json = diff
            .filter(|d| !d.is_empty())
            .map(|d| d.into_json().to_string());

        tokio::spawn(async move {
            if let Err(e) = db::activity::insert(
                &pool,
                regulation_id,
                &action,
                &description,
                &changed_by,
                diff_json.as_deref(),
            )
            .await
            {
                warn!("activity log append failed ({}): {}", action, e);
            }
        });
    }
}
