//! Ownership oracle
//!
//! Gates every sharing mutation. An artifact row may only be mutated by
//! the department it originates from: replicas (source_department_id set
//! to another department) are read-only on the receiving side, and a
//! course is owned transitively through the semester containing it.

use crp_common::{ArtifactKind, Error, Result};
use sqlx::SqlitePool;

use crate::db::{courses, departments, provenance, semesters, text_items};

/// The department allowed to mutate an artifact, with its regulation
#[derive(Debug, Clone, Copy)]
pub struct ArtifactOwner {
    pub department_id: i64,
    pub regulation_id: i64,
}

const RECEIVED_ITEM: &str = "Cannot change visibility of received items";

/// Resolve the owner of an artifact, or fail with NotOwner when the row is
/// a replica. NotFound when the id does not resolve at all.
pub async fn assert_owner(pool: &SqlitePool, kind: ArtifactKind, item_id: i64) -> Result<ArtifactOwner> {
    match kind {
        k if k.is_text() => {
            let item = text_items::fetch_by_id(pool, kind, item_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("{} item {}", kind, item_id)))?;

            if let Some(source) = item.source_department_id {
                if source != item.department_id {
                    return Err(Error::NotOwner(RECEIVED_ITEM.to_string()));
                }
            }

            let regulation_id = departments::regulation_of(pool, item.department_id)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!("department {}", item.department_id))
                })?;

            Ok(ArtifactOwner {
                department_id: item.department_id,
                regulation_id,
            })
        }

        ArtifactKind::Semester => {
            let semester = semesters::fetch_by_id(pool, item_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("semester {}", item_id)))?;

            let department_id = departments::department_of_regulation(pool, semester.regulation_id)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!("regulation {}", semester.regulation_id))
                })?;

            if let Some(source) = semester.source_department_id {
                if source != department_id {
                    return Err(Error::NotOwner(RECEIVED_ITEM.to_string()));
                }
            }

            Ok(ArtifactOwner {
                department_id,
                regulation_id: semester.regulation_id,
            })
        }

        ArtifactKind::Course => {
            courses::fetch_by_id(pool, item_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("course {}", item_id)))?;

            // Courses carry no source column; ownership flows through the
            // first semester that links them.
            let (regulation_id, semester_id) = courses::first_link_of_course(pool, item_id)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!("course {} is not part of any curriculum", item_id))
                })?;

            let semester = semesters::fetch_by_id(pool, semester_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("semester {}", semester_id)))?;

            let department_id = departments::department_of_regulation(pool, regulation_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("regulation {}", regulation_id)))?;

            if let Some(source) = semester.source_department_id {
                if source != department_id {
                    return Err(Error::NotOwner(RECEIVED_ITEM.to_string()));
                }
            }

            // A course copy may sit in the recipient's own semester (shared
            // individually, or adopted by code), so the containing semester
            // alone does not prove ownership; the ledger does.
            if let Some(entry) =
                provenance::find_by_copy(pool, ArtifactKind::Course, item_id).await?
            {
                if entry.target_department_id == department_id {
                    return Err(Error::NotOwner(RECEIVED_ITEM.to_string()));
                }
            }

            Ok(ArtifactOwner {
                department_id,
                regulation_id,
            })
        }

        _ => unreachable!("text kinds handled above"),
    }
}
