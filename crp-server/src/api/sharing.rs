//! Sharing state and visibility endpoints
//!
//! The visibility toggle translates one request into exactly one of the
//! engine verbs: share, unshare, add-targets, or remove-targets.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crp_common::{ArtifactKind, SharingMode, Visibility};

use crate::db::{clusters, courses, departments, provenance, semesters, text_items};
use crate::sharing::engine;
use crate::{ApiError, ApiResult, AppState};

/// One text-list item as seen by the sharing UI
#[derive(Debug, Serialize)]
pub struct TextItemView {
    pub id: i64,
    pub text: String,
    pub visibility: Visibility,
    pub position: i64,
    pub is_owner: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_department_id: Option<i64>,
}

impl TextItemView {
    fn from_item(item: text_items::TextItem, department_id: i64) -> Self {
        let is_owner = item
            .source_department_id
            .map_or(true, |source| source == department_id);
        Self {
            id: item.id,
            text: item.text,
            visibility: item.visibility,
            position: item.position,
            is_owner,
            source_department_id: item.source_department_id,
        }
    }
}

/// A course inside a semester listing
#[derive(Debug, Serialize)]
pub struct CourseView {
    pub id: i64,
    pub course_code: String,
    pub course_name: String,
    pub visibility: Visibility,
    pub is_owner: bool,
}

/// A semester with its linked courses
#[derive(Debug, Serialize)]
pub struct SemesterView {
    pub id: i64,
    pub semester_number: Option<i64>,
    pub visibility: Visibility,
    pub is_owner: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_department_id: Option<i64>,
    pub courses: Vec<CourseView>,
}

/// A member department in a cluster listing
#[derive(Debug, Serialize)]
pub struct ClusterDepartmentView {
    pub department_id: i64,
    pub regulation_id: i64,
    pub name: String,
}

/// GET /regulation/{id}/sharing response
#[derive(Debug, Serialize)]
pub struct RegulationSharingResponse {
    pub department_id: i64,
    pub regulation_id: i64,
    pub in_cluster: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_departments: Option<Vec<ClusterDepartmentView>>,
    pub mission: Vec<TextItemView>,
    pub peos: Vec<TextItemView>,
    pub pos: Vec<TextItemView>,
    pub psos: Vec<TextItemView>,
    pub semesters: Vec<SemesterView>,
}

/// GET /regulation/:id/sharing
///
/// Full sharing state of one department: cluster membership, every text
/// item, and every semester with its courses, each flagged with ownership.
pub async fn get_regulation_sharing(
    State(state): State<AppState>,
    Path(regulation_id): Path<i64>,
) -> ApiResult<Json<RegulationSharingResponse>> {
    let department_id = departments::department_of_regulation(&state.db, regulation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("regulation {}", regulation_id)))?;

    let cluster = clusters::cluster_of(&state.db, department_id).await?;
    let cluster_departments = match &cluster {
        Some(info) => Some(
            clusters::members_of(&state.db, info.id)
                .await?
                .into_iter()
                .map(|peer| ClusterDepartmentView {
                    department_id: peer.department_id,
                    regulation_id: peer.regulation_id,
                    name: peer.name,
                })
                .collect(),
        ),
        None => None,
    };

    let mut text_lists = Vec::with_capacity(4);
    for kind in [
        ArtifactKind::Mission,
        ArtifactKind::Peos,
        ArtifactKind::Pos,
        ArtifactKind::Psos,
    ] {
        let items = text_items::fetch_by_department(&state.db, kind, department_id)
            .await?
            .into_iter()
            .map(|item| TextItemView::from_item(item, department_id))
            .collect::<Vec<_>>();
        text_lists.push(items);
    }
    let psos = text_lists.pop().unwrap_or_default();
    let pos = text_lists.pop().unwrap_or_default();
    let peos = text_lists.pop().unwrap_or_default();
    let mission = text_lists.pop().unwrap_or_default();

    let mut semester_views = Vec::new();
    for semester in semesters::fetch_by_regulation(&state.db, regulation_id).await? {
        let is_owner = semester
            .source_department_id
            .map_or(true, |source| source == department_id);
        let course_views = courses::courses_in_semester(&state.db, semester.id)
            .await?
            .into_iter()
            .map(|course| CourseView {
                id: course.course_id,
                course_code: course.course_code,
                course_name: course.course_name,
                visibility: course.visibility,
                is_owner,
            })
            .collect();
        semester_views.push(SemesterView {
            id: semester.id,
            semester_number: semester.semester_number,
            visibility: semester.visibility,
            is_owner,
            source_department_id: semester.source_department_id,
            courses: course_views,
        });
    }

    Ok(Json(RegulationSharingResponse {
        department_id,
        regulation_id,
        in_cluster: cluster.is_some(),
        cluster_id: cluster.as_ref().map(|c| c.id),
        cluster_name: cluster.map(|c| c.name),
        cluster_departments,
        mission,
        peos,
        pos,
        psos,
        semesters: semester_views,
    }))
}

/// PUT /item/visibility request body
#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub item_type: String,
    pub item_id: i64,
    pub visibility: String,
    #[serde(default)]
    pub target_departments: Option<Vec<i64>>,
    #[serde(default)]
    pub sharing_mode: SharingMode,
}

/// PUT /item/visibility response
#[derive(Debug, Serialize)]
pub struct VisibilityResponse {
    pub message: String,
    pub visibility: Visibility,
}

/// PUT /item/visibility
///
/// Toggle an artifact between UNIQUE and CLUSTER, optionally against a
/// subset of peers. `sharing_mode` selects replace/add/remove semantics.
pub async fn set_item_visibility(
    State(state): State<AppState>,
    Json(request): Json<VisibilityRequest>,
) -> ApiResult<Json<VisibilityResponse>> {
    let kind = ArtifactKind::from_str(&request.item_type)?;
    let visibility = Visibility::from_str(&request.visibility)?;
    let targets = request.target_departments.unwrap_or_default();

    match visibility {
        Visibility::Cluster => match request.sharing_mode {
            SharingMode::Replace => {
                let outcome =
                    engine::share(&state.db, &state.activity, kind, request.item_id, &targets)
                        .await?;
                Ok(Json(VisibilityResponse {
                    message: share_message(&outcome),
                    visibility: Visibility::Cluster,
                }))
            }
            SharingMode::Add => {
                if targets.is_empty() {
                    return Err(ApiError::BadRequest(
                        "target_departments is required for sharing_mode=add".to_string(),
                    ));
                }
                let outcome = engine::add_targets(
                    &state.db,
                    &state.activity,
                    kind,
                    request.item_id,
                    &targets,
                )
                .await?;
                Ok(Json(VisibilityResponse {
                    message: share_message(&outcome),
                    visibility: Visibility::Cluster,
                }))
            }
            SharingMode::Remove => {
                if targets.is_empty() {
                    return Err(ApiError::BadRequest(
                        "target_departments is required for sharing_mode=remove".to_string(),
                    ));
                }
                let outcome = engine::remove_targets(
                    &state.db,
                    &state.activity,
                    kind,
                    request.item_id,
                    &targets,
                )
                .await?;
                let visibility = if outcome.now_unique {
                    Visibility::Unique
                } else {
                    Visibility::Cluster
                };
                Ok(Json(VisibilityResponse {
                    message: format!(
                        "Removed sharing from {} department(s)",
                        outcome.removed.len()
                    ),
                    visibility,
                }))
            }
        },
        Visibility::Unique => {
            let outcome =
                engine::unshare(&state.db, &state.activity, kind, request.item_id).await?;
            Ok(Json(VisibilityResponse {
                message: format!(
                    "Sharing removed; {} cop{} deleted",
                    outcome.removed.len(),
                    if outcome.removed.len() == 1 { "y" } else { "ies" }
                ),
                visibility: Visibility::Unique,
            }))
        }
    }
}

fn share_message(outcome: &engine::ShareOutcome) -> String {
    if outcome.skipped.is_empty() {
        format!("Shared with {} department(s)", outcome.shared_to.len())
    } else {
        format!(
            "Shared with {} department(s), {} skipped",
            outcome.shared_to.len(),
            outcome.skipped.len()
        )
    }
}

/// GET /item/{item_type}/{item_id}/recipients response
#[derive(Debug, Serialize)]
pub struct RecipientsResponse {
    pub source_department_id: i64,
    pub shared_with: Vec<i64>,
}

/// GET /item/:item_type/:item_id/recipients
///
/// Current recipient set of an artifact. Works from either side: querying
/// a copy resolves back to its source first.
pub async fn get_item_recipients(
    State(state): State<AppState>,
    Path((item_type, item_id)): Path<(String, i64)>,
) -> ApiResult<Json<RecipientsResponse>> {
    let kind = ArtifactKind::from_str(&item_type)?;

    // A copy resolves to its ledger row; an owned item resolves to itself
    let (source_department_id, source_item_id) =
        match provenance::find_by_copy(&state.db, kind, item_id).await? {
            Some(entry) => (entry.source_department_id, entry.source_item_id),
            None => {
                let owner =
                    crate::sharing::ownership::assert_owner(&state.db, kind, item_id).await?;
                (owner.department_id, item_id)
            }
        };

    let shared_with = provenance::targets_of(&state.db, source_department_id, kind, source_item_id)
        .await?
        .into_iter()
        .map(|(target, _)| target)
        .collect();

    Ok(Json(RecipientsResponse {
        source_department_id,
        shared_with,
    }))
}

/// Per-department slice of GET /cluster/{id}/shared
#[derive(Debug, Serialize)]
pub struct DepartmentSharedView {
    pub department_id: i64,
    pub regulation_id: i64,
    pub name: String,
    pub mission: Vec<TextItemView>,
    pub peos: Vec<TextItemView>,
    pub pos: Vec<TextItemView>,
    pub psos: Vec<TextItemView>,
    pub semesters: Vec<SemesterView>,
}

/// GET /cluster/{id}/shared response
#[derive(Debug, Serialize)]
pub struct ClusterSharedResponse {
    pub cluster_id: i64,
    pub cluster_name: String,
    pub departments: Vec<DepartmentSharedView>,
}

/// GET /cluster/:id/shared
///
/// Enumerates the CLUSTER-visible content of every member department.
pub async fn get_cluster_shared(
    State(state): State<AppState>,
    Path(cluster_id): Path<i64>,
) -> ApiResult<Json<ClusterSharedResponse>> {
    let cluster = clusters::fetch_by_id(&state.db, cluster_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("cluster {}", cluster_id)))?;

    let mut departments_view = Vec::new();
    for member in clusters::members_of(&state.db, cluster_id).await? {
        let mut lists = Vec::with_capacity(4);
        for kind in [
            ArtifactKind::Mission,
            ArtifactKind::Peos,
            ArtifactKind::Pos,
            ArtifactKind::Psos,
        ] {
            let items = text_items::fetch_by_department(&state.db, kind, member.department_id)
                .await?
                .into_iter()
                .filter(|item| item.visibility == Visibility::Cluster)
                .map(|item| TextItemView::from_item(item, member.department_id))
                .collect::<Vec<_>>();
            lists.push(items);
        }
        let psos = lists.pop().unwrap_or_default();
        let pos = lists.pop().unwrap_or_default();
        let peos = lists.pop().unwrap_or_default();
        let mission = lists.pop().unwrap_or_default();

        let mut semester_views = Vec::new();
        for semester in semesters::fetch_by_regulation(&state.db, member.regulation_id).await? {
            if semester.visibility != Visibility::Cluster {
                continue;
            }
            let is_owner = semester
                .source_department_id
                .map_or(true, |source| source == member.department_id);
            let course_views = courses::courses_in_semester(&state.db, semester.id)
                .await?
                .into_iter()
                .map(|course| CourseView {
                    id: course.course_id,
                    course_code: course.course_code,
                    course_name: course.course_name,
                    visibility: course.visibility,
                    is_owner,
                })
                .collect();
            semester_views.push(SemesterView {
                id: semester.id,
                semester_number: semester.semester_number,
                visibility: semester.visibility,
                is_owner,
                source_department_id: semester.source_department_id,
                courses: course_views,
            });
        }

        departments_view.push(DepartmentSharedView {
            department_id: member.department_id,
            regulation_id: member.regulation_id,
            name: member.name,
            mission,
            peos,
            pos,
            psos,
            semesters: semester_views,
        });
    }

    Ok(Json(ClusterSharedResponse {
        cluster_id: cluster.id,
        cluster_name: cluster.name,
        departments: departments_view,
    }))
}
