//! crp-server library - Curriculum & Regulation Portal backend
//!
//! Serves the departmental curriculum artifacts (mission/PEO/PO/PSO lists,
//! semesters, courses, syllabi, competency mappings) over JSON/HTTP and
//! implements cluster sharing: replicating artifacts owned by one
//! department into its cluster peers and keeping the copies in sync.

use axum::Router;
use sqlx::SqlitePool;

pub mod activity;
pub mod api;
pub mod db;
pub mod error;
pub mod sharing;

pub use activity::ActivityLogger;
pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Fire-and-forget changelog writer
    pub activity: ActivityLogger,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        let activity = ActivityLogger::new(db.clone());
        Self { db, activity }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post, put};
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/regulation/:id/sharing", get(api::get_regulation_sharing))
        .route("/item", post(api::create_text_item))
        .route("/item/text", put(api::update_text_item))
        .route("/item/visibility", put(api::set_item_visibility))
        .route("/item/:item_type/:item_id", delete(api::delete_item))
        .route("/item/:item_type/:item_id/recipients", get(api::get_item_recipients))
        .route("/cluster/:id/shared", get(api::get_cluster_shared))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
