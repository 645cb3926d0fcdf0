//! Text-list item CRUD
//!
//! Owner-side editing surface for mission/PEO/PO/PSO lists. Edits on a
//! CLUSTER item propagate to every replica; deletes cascade to them.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crp_common::{ArtifactKind, Visibility};

use crate::activity::FieldDiff;
use crate::db::{departments, text_items};
use crate::sharing::{engine, ownership};
use crate::{ApiError, ApiResult, AppState};

/// POST /item request body
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub item_type: String,
    pub department_id: i64,
    pub text: String,
    #[serde(default)]
    pub position: i64,
}

/// POST /item response
#[derive(Debug, Serialize)]
pub struct CreateItemResponse {
    pub id: i64,
    pub visibility: Visibility,
}

/// POST /item
///
/// Create a text-list item. New items are always UNIQUE; sharing is a
/// separate, explicit operation.
pub async fn create_text_item(
    State(state): State<AppState>,
    Json(request): Json<CreateItemRequest>,
) -> ApiResult<Json<CreateItemResponse>> {
    let kind = ArtifactKind::from_str(&request.item_type)?;
    if !kind.is_text() {
        return Err(ApiError::BadRequest(format!(
            "{} items cannot be created through this endpoint",
            kind
        )));
    }
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text cannot be empty".to_string()));
    }

    let regulation_id = departments::regulation_of(&state.db, request.department_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("department {}", request.department_id)))?;

    let id = text_items::insert(
        &state.db,
        kind,
        request.department_id,
        &request.text,
        request.position,
    )
    .await?;

    let mut diff = FieldDiff::new();
    diff.push(format!("{}[{}]", kind, request.position), "", request.text.clone());
    state.activity.log(
        regulation_id,
        "CREATE",
        format!("Added {} item {}", kind, id),
        "system",
        Some(diff),
    );

    Ok(Json(CreateItemResponse {
        id,
        visibility: Visibility::Unique,
    }))
}

/// PUT /item/text request body
#[derive(Debug, Deserialize)]
pub struct UpdateTextRequest {
    pub item_type: String,
    pub item_id: i64,
    pub text: String,
}

/// PUT /item/text response
#[derive(Debug, Serialize)]
pub struct UpdateTextResponse {
    pub message: String,
    pub updated_copies: usize,
}

/// PUT /item/text
///
/// Edit the text of an owned item. When the item is CLUSTER the new text
/// is pushed to every ledger-listed copy.
pub async fn update_text_item(
    State(state): State<AppState>,
    Json(request): Json<UpdateTextRequest>,
) -> ApiResult<Json<UpdateTextResponse>> {
    let kind = ArtifactKind::from_str(&request.item_type)?;
    if !kind.is_text() {
        return Err(ApiError::BadRequest(format!(
            "{} items cannot be edited through this endpoint",
            kind
        )));
    }

    let owner = ownership::assert_owner(&state.db, kind, request.item_id).await?;
    let item = text_items::fetch_by_id(&state.db, kind, request.item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} item {}", kind, request.item_id)))?;

    text_items::update_text(&state.db, kind, request.item_id, &request.text).await?;

    let updated_copies = if item.visibility == Visibility::Cluster {
        engine::propagate_edit(&state.db, kind, request.item_id, &request.text).await?
    } else {
        0
    };

    let mut diff = FieldDiff::new();
    diff.push(
        format!("{}[{}]", kind, item.position),
        item.text,
        request.text.clone(),
    );
    state.activity.log(
        owner.regulation_id,
        "EDIT",
        format!(
            "Edited {} item {} ({} copies updated)",
            kind, request.item_id, updated_copies
        ),
        "system",
        Some(diff),
    );

    Ok(Json(UpdateTextResponse {
        message: "Item updated".to_string(),
        updated_copies,
    }))
}

/// DELETE /item/:item_type/:item_id response
#[derive(Debug, Serialize)]
pub struct DeleteItemResponse {
    pub message: String,
}

/// DELETE /item/:item_type/:item_id
///
/// Delete an owned artifact; every replicated copy is removed first.
pub async fn delete_item(
    State(state): State<AppState>,
    Path((item_type, item_id)): Path<(String, i64)>,
) -> ApiResult<Json<DeleteItemResponse>> {
    let kind = ArtifactKind::from_str(&item_type)?;

    engine::delete_source(&state.db, &state.activity, kind, item_id).await?;

    Ok(Json(DeleteItemResponse {
        message: format!("{} {} deleted", kind, item_id),
    }))
}
