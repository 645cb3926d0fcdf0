//! Replication engine
//!
//! Executes ownership-verified sharing mutations: share, unshare,
//! add-targets, remove-targets, edit propagation, and source deletion with
//! cascade. Text kinds replicate as single rows; semesters and courses
//! replicate deep (linked courses, syllabus trees, PEO-PO matrix).
//!
//! Failure policy: per-recipient failures are logged and skipped, never
//! rolled back. During removal a failing recipient keeps its ledger row so
//! the operation can be retried. Only caller-side errors (not owner, not
//! in a cluster, unknown artifact) fail the whole call.

use crp_common::{ArtifactKind, Error, Result, Visibility};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::activity::{ActivityLogger, FieldDiff};
use crate::db::clusters::Peer;
use crate::db::{clusters, courses, mappings, provenance, semesters, syllabus, text_items};
use crate::sharing::ownership::{self, ArtifactOwner};

/// Result of a share / add-targets fan-out
#[derive(Debug, Default)]
pub struct ShareOutcome {
    /// Departments that received (or already held) a copy
    pub shared_to: Vec<i64>,
    /// Departments skipped: failed precondition or replication error
    pub skipped: Vec<i64>,
}

/// Result of an unshare / remove-targets cascade
#[derive(Debug, Default)]
pub struct RemoveOutcome {
    /// Departments whose copies were deleted
    pub removed: Vec<i64>,
    /// True when no recipients remain and the source flipped back to UNIQUE
    pub now_unique: bool,
}

/// Source artifact loaded once before the fan-out
enum SourceArtifact {
    Text(text_items::TextItem),
    /// Semester plus its correlation number
    Semester(semesters::Semester, i64),
    /// Course plus the number of the semester containing it on the owner side
    Course(courses::Course, i64),
}

/// UNIQUE → CLUSTER: materialize copies into every peer (or the given
/// subset) and record them in the ledger.
pub async fn share(
    pool: &SqlitePool,
    activity: &ActivityLogger,
    kind: ArtifactKind,
    item_id: i64,
    targets: &[i64],
) -> Result<ShareOutcome> {
    fan_out(pool, activity, kind, item_id, targets, false, "SHARE").await
}

/// Extend the recipient set: like share, but recipients already in the
/// ledger are left untouched.
pub async fn add_targets(
    pool: &SqlitePool,
    activity: &ActivityLogger,
    kind: ArtifactKind,
    item_id: i64,
    targets: &[i64],
) -> Result<ShareOutcome> {
    fan_out(pool, activity, kind, item_id, targets, true, "ADD_TARGETS").await
}

/// CLUSTER → UNIQUE: delete every copy in reverse dependency order, then
/// clear the ledger.
pub async fn unshare(
    pool: &SqlitePool,
    activity: &ActivityLogger,
    kind: ArtifactKind,
    item_id: i64,
) -> Result<RemoveOutcome> {
    remove_recipients(pool, activity, kind, item_id, None, "UNSHARE").await
}

/// Shrink the recipient set; flips the source back to UNIQUE when the
/// ledger becomes empty.
pub async fn remove_targets(
    pool: &SqlitePool,
    activity: &ActivityLogger,
    kind: ArtifactKind,
    item_id: i64,
    targets: &[i64],
) -> Result<RemoveOutcome> {
    remove_recipients(pool, activity, kind, item_id, Some(targets), "REMOVE_TARGETS").await
}

/// Push a text edit to every ledger-listed copy. Returns how many copies
/// were updated. Non-text kinds do not propagate edits.
pub async fn propagate_edit(
    pool: &SqlitePool,
    kind: ArtifactKind,
    item_id: i64,
    new_text: &str,
) -> Result<usize> {
    if !kind.is_text() {
        return Err(Error::InvalidInput(format!(
            "edit propagation is not supported for {}",
            kind
        )));
    }
    let owner = ownership::assert_owner(pool, kind, item_id).await?;

    let mut updated = 0;
    for (target, copy_id) in
        provenance::targets_of(pool, owner.department_id, kind, item_id).await?
    {
        match text_items::update_text(pool, kind, copy_id, new_text).await {
            Ok(()) => updated += 1,
            Err(e) => warn!(
                "edit propagation of {} {} to department {} failed: {}",
                kind, item_id, target, e
            ),
        }
    }
    Ok(updated)
}

/// Delete a source artifact, cascading to every replicated copy first.
pub async fn delete_source(
    pool: &SqlitePool,
    activity: &ActivityLogger,
    kind: ArtifactKind,
    item_id: i64,
) -> Result<()> {
    let owner = ownership::assert_owner(pool, kind, item_id).await?;

    for (target, copy_id) in
        provenance::targets_of(pool, owner.department_id, kind, item_id).await?
    {
        if let Err(e) = remove_copy(pool, kind, target, copy_id).await {
            warn!(
                "cascade delete of {} copy {} in department {} failed: {}",
                kind, copy_id, target, e
            );
        }
    }
    provenance::forget(pool, owner.department_id, kind, item_id).await?;

    match kind {
        k if k.is_text() => text_items::delete(pool, kind, item_id).await?,
        ArtifactKind::Semester => {
            // Courses whose only curriculum link was this semester go with
            // it; courses also linked elsewhere survive.
            let carried = courses::courses_in_semester(pool, item_id).await?;
            courses::unlink_semester(pool, item_id).await?;
            for course in carried {
                if courses::first_link_of_course(pool, course.course_id)
                    .await?
                    .is_none()
                {
                    provenance::forget(
                        pool,
                        owner.department_id,
                        ArtifactKind::Course,
                        course.course_id,
                    )
                    .await?;
                    delete_course_deep(pool, course.course_id).await?;
                }
            }
            semesters::delete(pool, item_id).await?;
        }
        ArtifactKind::Course => delete_course_deep(pool, item_id).await?,
        _ => unreachable!("text kinds handled above"),
    }

    activity.log(
        owner.regulation_id,
        "DELETE",
        format!("Deleted {} {} and its shared copies", kind, item_id),
        "system",
        None,
    );
    Ok(())
}

/// Common fan-out for share and add-targets
async fn fan_out(
    pool: &SqlitePool,
    activity: &ActivityLogger,
    kind: ArtifactKind,
    item_id: i64,
    targets: &[i64],
    add_only: bool,
    action: &str,
) -> Result<ShareOutcome> {
    let owner = ownership::assert_owner(pool, kind, item_id).await?;

    clusters::cluster_of(pool, owner.department_id)
        .await?
        .ok_or(Error::NotInCluster(owner.department_id))?;

    let peers = clusters::peers_of(pool, owner.department_id).await?;
    let mut recipients: Vec<Peer> = if targets.is_empty() {
        peers
    } else {
        peers
            .into_iter()
            .filter(|p| targets.contains(&p.department_id))
            .collect()
    };

    if add_only {
        let existing: Vec<i64> =
            provenance::targets_of(pool, owner.department_id, kind, item_id)
                .await?
                .into_iter()
                .map(|(target, _)| target)
                .collect();
        recipients.retain(|p| !existing.contains(&p.department_id));
    }

    let source = load_source(pool, kind, item_id, &owner).await?;
    let previous_visibility = source_visibility(&source);

    let mut outcome = ShareOutcome::default();
    for peer in &recipients {
        match replicate_to(pool, activity, kind, &source, &owner, peer).await {
            Ok(Some(copy_id)) => {
                // Copy row first, ledger second: a reader never sees a
                // ledger row whose copy does not exist yet.
                match provenance::record(
                    pool,
                    owner.department_id,
                    peer.department_id,
                    kind,
                    item_id,
                    copy_id,
                )
                .await
                {
                    Ok(()) => outcome.shared_to.push(peer.department_id),
                    Err(e) => {
                        warn!(
                            "ledger write for {} {} to department {} failed: {}",
                            kind, item_id, peer.department_id, e
                        );
                        outcome.skipped.push(peer.department_id);
                    }
                }
            }
            Ok(None) => {
                outcome.skipped.push(peer.department_id);
            }
            Err(e) => {
                warn!(
                    "replication of {} {} to department {} failed: {}",
                    kind, item_id, peer.department_id, e
                );
                outcome.skipped.push(peer.department_id);
            }
        }
    }

    set_source_visibility(pool, kind, item_id, Visibility::Cluster).await?;

    let mut diff = FieldDiff::new();
    diff.push(
        "visibility",
        previous_visibility.as_str(),
        Visibility::Cluster.as_str(),
    );
    activity.log(
        owner.regulation_id,
        action,
        format!(
            "Shared {} {} with departments {:?}",
            kind, item_id, outcome.shared_to
        ),
        "system",
        Some(diff),
    );

    Ok(outcome)
}

/// Common per-recipient removal for unshare and remove-targets
async fn remove_recipients(
    pool: &SqlitePool,
    activity: &ActivityLogger,
    kind: ArtifactKind,
    item_id: i64,
    restrict_to: Option<&[i64]>,
    action: &str,
) -> Result<RemoveOutcome> {
    let owner = ownership::assert_owner(pool, kind, item_id).await?;

    let mut outcome = RemoveOutcome::default();
    for (target, copy_id) in
        provenance::targets_of(pool, owner.department_id, kind, item_id).await?
    {
        if let Some(wanted) = restrict_to {
            if !wanted.contains(&target) {
                continue;
            }
        }

        match remove_copy(pool, kind, target, copy_id).await {
            Ok(()) => {
                provenance::forget_target(pool, owner.department_id, target, kind, item_id)
                    .await?;
                outcome.removed.push(target);
            }
            Err(e) => {
                // Ledger row stays in place so the removal can be retried
                warn!(
                    "removal of {} copy {} from department {} failed: {}",
                    kind, copy_id, target, e
                );
            }
        }
    }

    let remaining = provenance::targets_of(pool, owner.department_id, kind, item_id).await?;
    if remaining.is_empty() {
        set_source_visibility(pool, kind, item_id, Visibility::Unique).await?;
        outcome.now_unique = true;
    }

    let mut diff = FieldDiff::new();
    if outcome.now_unique {
        diff.push(
            "visibility",
            Visibility::Cluster.as_str(),
            Visibility::Unique.as_str(),
        );
    }
    activity.log(
        owner.regulation_id,
        action,
        format!(
            "Removed {} {} copies from departments {:?}",
            kind, item_id, outcome.removed
        ),
        "system",
        Some(diff),
    );

    Ok(outcome)
}

/// Load the source artifact once, validating kind-specific preconditions
async fn load_source(
    pool: &SqlitePool,
    kind: ArtifactKind,
    item_id: i64,
    owner: &ArtifactOwner,
) -> Result<SourceArtifact> {
    match kind {
        k if k.is_text() => {
            let item = text_items::fetch_by_id(pool, kind, item_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("{} item {}", kind, item_id)))?;
            Ok(SourceArtifact::Text(item))
        }
        ArtifactKind::Semester => {
            let semester = semesters::fetch_by_id(pool, item_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("semester {}", item_id)))?;
            let number = semester.semester_number.ok_or_else(|| {
                Error::InvalidInput(format!("semester {} has no semester number", item_id))
            })?;
            Ok(SourceArtifact::Semester(semester, number))
        }
        ArtifactKind::Course => {
            let course = courses::fetch_by_id(pool, item_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("course {}", item_id)))?;
            let semester_id = courses::semester_of_course(pool, item_id, owner.regulation_id)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!(
                        "course {} is not part of regulation {}",
                        item_id, owner.regulation_id
                    ))
                })?;
            let semester = semesters::fetch_by_id(pool, semester_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("semester {}", semester_id)))?;
            let number = semester.semester_number.ok_or_else(|| {
                Error::InvalidInput(format!("semester {} has no semester number", semester_id))
            })?;
            Ok(SourceArtifact::Course(course, number))
        }
        _ => unreachable!("text kinds handled above"),
    }
}

fn source_visibility(source: &SourceArtifact) -> Visibility {
    match source {
        SourceArtifact::Text(item) => item.visibility,
        SourceArtifact::Semester(semester, _) => semester.visibility,
        SourceArtifact::Course(course, _) => course.visibility,
    }
}

/// Materialize one copy in one peer department. Returns the copy id, or
/// None when the recipient-side precondition is unmet and the peer is
/// skipped.
async fn replicate_to(
    pool: &SqlitePool,
    activity: &ActivityLogger,
    kind: ArtifactKind,
    source: &SourceArtifact,
    owner: &ArtifactOwner,
    peer: &Peer,
) -> Result<Option<i64>> {
    match source {
        SourceArtifact::Text(item) => {
            // Adopt a matching replica if one already exists; never duplicate
            let copy_id = match text_items::find_matching_copy(
                pool,
                kind,
                peer.department_id,
                owner.department_id,
                &item.text,
            )
            .await?
            {
                Some(existing) => {
                    if existing.visibility == Visibility::Unique {
                        text_items::set_visibility(pool, kind, existing.id, Visibility::Cluster)
                            .await?;
                    }
                    existing.id
                }
                None => {
                    text_items::insert_copy(
                        pool,
                        kind,
                        peer.department_id,
                        &item.text,
                        item.position,
                        owner.department_id,
                    )
                    .await?
                }
            };
            Ok(Some(copy_id))
        }

        SourceArtifact::Semester(semester, number) => {
            if let Some(existing) = semesters::find_copy_by_number(
                pool,
                peer.regulation_id,
                *number,
                owner.department_id,
            )
            .await?
            {
                return Ok(Some(existing.id));
            }

            let new_semester_id = semesters::insert_copy(
                pool,
                peer.regulation_id,
                *number,
                &semester.card_type,
                owner.department_id,
            )
            .await?;

            copy_courses_between_semesters(pool, owner, semester.id, peer, new_semester_id)
                .await?;

            // Best-effort: a failed matrix copy must not fail the share
            if let Err(e) =
                mappings::copy_peo_po(pool, owner.regulation_id, peer.regulation_id).await
            {
                warn!(
                    "PEO-PO matrix copy from regulation {} to {} failed: {}",
                    owner.regulation_id, peer.regulation_id, e
                );
            }

            Ok(Some(new_semester_id))
        }

        SourceArtifact::Course(course, number) => {
            // The receiving regulation must already hold a semester with
            // the same number; otherwise the recipient is skipped.
            let Some(target_semester) =
                semesters::find_by_number(pool, peer.regulation_id, *number).await?
            else {
                info!(
                    "course {} not shared to department {}: no semester {} on the receiving side",
                    course.course_code, peer.department_id, number
                );
                activity.log(
                    owner.regulation_id,
                    "PRECONDITION_UNMET",
                    format!(
                        "Course {} not shared to department {}: no semester {} on the receiving side",
                        course.course_code, peer.department_id, number
                    ),
                    "system",
                    None,
                );
                return Ok(None);
            };

            let copy_id = replicate_course_record(pool, course, peer.regulation_id).await?;
            courses::link_course_to_semester(
                pool,
                peer.regulation_id,
                target_semester.id,
                copy_id,
            )
            .await?;
            Ok(Some(copy_id))
        }
    }
}

/// Adopt-or-clone a course record and its syllabus into a regulation
async fn replicate_course_record(
    pool: &SqlitePool,
    course: &courses::Course,
    target_regulation_id: i64,
) -> Result<i64> {
    let (copy_id, cloned) = courses::adopt_or_clone(pool, course, target_regulation_id).await?;
    if cloned {
        syllabus::clone_tree(pool, course.course_id, copy_id).await?;
    } else {
        // Adopted record joins the cluster-visible set
        courses::set_visibility(pool, copy_id, Visibility::Cluster).await?;
    }
    Ok(copy_id)
}

/// Carry every course of the source semester into the freshly created
/// semester copy, tracking each in the ledger.
async fn copy_courses_between_semesters(
    pool: &SqlitePool,
    owner: &ArtifactOwner,
    source_semester_id: i64,
    peer: &Peer,
    target_semester_id: i64,
) -> Result<()> {
    for course in courses::courses_in_semester(pool, source_semester_id).await? {
        let copy_id = replicate_course_record(pool, &course, peer.regulation_id).await?;
        courses::link_course_to_semester(pool, peer.regulation_id, target_semester_id, copy_id)
            .await?;
        provenance::record(
            pool,
            owner.department_id,
            peer.department_id,
            ArtifactKind::Course,
            course.course_id,
            copy_id,
        )
        .await?;
    }
    Ok(())
}

/// Delete one materialized copy in reverse dependency order
async fn remove_copy(
    pool: &SqlitePool,
    kind: ArtifactKind,
    target_department_id: i64,
    copy_id: i64,
) -> Result<()> {
    match kind {
        k if k.is_text() => text_items::delete(pool, kind, copy_id).await,

        ArtifactKind::Course => delete_course_deep(pool, copy_id).await,

        ArtifactKind::Semester => {
            // Courses carried along by the semester replication are
            // discovered by live link, not by ledger.
            for course in courses::courses_in_semester(pool, copy_id).await? {
                delete_course_deep(pool, course.course_id).await?;
                provenance::forget_copy(
                    pool,
                    target_department_id,
                    ArtifactKind::Course,
                    course.course_id,
                )
                .await?;
            }
            courses::unlink_semester(pool, copy_id).await?;
            semesters::delete(pool, copy_id).await
        }

        _ => unreachable!("text kinds handled above"),
    }
}

/// Full course-deletion chain: syllabus subtree, mapping rows, curriculum
/// links, then the course row itself.
async fn delete_course_deep(pool: &SqlitePool, course_id: i64) -> Result<()> {
    syllabus::delete_tree(pool, course_id).await?;
    mappings::delete_course_mappings(pool, course_id).await?;
    courses::unlink_course_everywhere(pool, course_id).await?;
    courses::delete(pool, course_id).await
}

async fn set_source_visibility(
    pool: &SqlitePool,
    kind: ArtifactKind,
    item_id: i64,
    visibility: Visibility,
) -> Result<()> {
    match kind {
        k if k.is_text() => text_items::set_visibility(pool, kind, item_id, visibility).await,
        ArtifactKind::Semester => semesters::set_visibility(pool, item_id, visibility).await,
        ArtifactKind::Course => courses::set_visibility(pool, item_id, visibility).await,
        _ => unreachable!("text kinds handled above"),
    }
}
