//! Deep replication tests: semesters drag their courses, syllabus trees
//! and the PEO-PO matrix along.

mod helpers;

use crp_common::{ArtifactKind, Visibility};
use crp_server::db::{courses, mappings, provenance, semesters};
use crp_server::sharing::engine;
use helpers::{cluster_fixture, count, seed_linked_course, seed_semester, seed_syllabus};

/// D1 semester 3 with CS301 + CS302 (both with syllabi); D2 and D3 each
/// have their own empty semester 3
async fn deep_fixture() -> (helpers::Fixture, i64, i64, i64) {
    let fx = cluster_fixture().await;

    let sem1 = seed_semester(&fx.pool, fx.reg1, 3).await;
    let cs301 = seed_linked_course(&fx.pool, fx.reg1, sem1, "CS301", "Algorithms").await;
    let cs302 = seed_linked_course(&fx.pool, fx.reg1, sem1, "CS302", "Databases").await;
    seed_syllabus(&fx.pool, cs301).await;
    seed_syllabus(&fx.pool, cs302).await;

    mappings::set_peo_po_value(&fx.pool, fx.reg1, 0, 0, 3).await.unwrap();
    mappings::set_peo_po_value(&fx.pool, fx.reg1, 0, 1, 2).await.unwrap();

    seed_semester(&fx.pool, fx.reg2, 3).await;
    seed_semester(&fx.pool, fx.reg3, 3).await;

    (fx, sem1, cs301, cs302)
}

#[tokio::test]
async fn semester_share_carries_courses_syllabi_and_peo_po_matrix() {
    let (fx, sem1, cs301, cs302) = deep_fixture().await;

    let outcome = engine::share(
        &fx.pool,
        &fx.activity(),
        ArtifactKind::Semester,
        sem1,
        &[fx.dept2],
    )
    .await
    .unwrap();
    assert_eq!(outcome.shared_to, vec![fx.dept2]);

    // A replica semester 3 exists in reg2
    let copy = semesters::find_copy_by_number(&fx.pool, fx.reg2, 3, fx.dept1)
        .await
        .unwrap()
        .expect("semester copy");
    assert_eq!(copy.visibility, Visibility::Cluster);

    // Both courses arrived with the same codes, CLUSTER visibility
    let carried = courses::courses_in_semester(&fx.pool, copy.id).await.unwrap();
    let codes: Vec<&str> = carried.iter().map(|c| c.course_code.as_str()).collect();
    assert_eq!(codes, vec!["CS301", "CS302"]);
    assert!(carried.iter().all(|c| c.visibility == Visibility::Cluster));
    assert!(carried.iter().all(|c| c.course_id != cs301 && c.course_id != cs302));

    // Syllabus trees duplicated (2 modules, 2 titles, 4 topics in total now)
    assert_eq!(count(&fx.pool, "syllabus_models", "").await, 4);
    assert_eq!(count(&fx.pool, "syllabus_titles", "").await, 4);
    assert_eq!(count(&fx.pool, "syllabus_topics", "").await, 8);

    // PEO-PO matrix of reg2 overwritten with reg1's
    let matrix = mappings::fetch_peo_po(&fx.pool, fx.reg2).await.unwrap();
    assert_eq!(matrix.len(), 2);
    assert_eq!(matrix[0].value, 3);

    // Ledger tracks the semester and each carried course
    let sem_targets = provenance::targets_of(&fx.pool, fx.dept1, ArtifactKind::Semester, sem1)
        .await
        .unwrap();
    assert_eq!(sem_targets, vec![(fx.dept2, copy.id)]);
    for source_course in [cs301, cs302] {
        let course_targets =
            provenance::targets_of(&fx.pool, fx.dept1, ArtifactKind::Course, source_course)
                .await
                .unwrap();
        assert_eq!(course_targets.len(), 1);
        assert_eq!(course_targets[0].0, fx.dept2);
    }
}

#[tokio::test]
async fn semester_reshare_adopts_existing_replica() {
    let (fx, sem1, _, _) = deep_fixture().await;

    engine::share(&fx.pool, &fx.activity(), ArtifactKind::Semester, sem1, &[fx.dept2])
        .await
        .unwrap();
    engine::share(&fx.pool, &fx.activity(), ArtifactKind::Semester, sem1, &[fx.dept2])
        .await
        .unwrap();

    // Still exactly one replica (plus D2's own semester 3 and D1's source)
    assert_eq!(
        count(
            &fx.pool,
            "semesters",
            &format!("regulation_id = {} AND source_department_id = {}", fx.reg2, fx.dept1)
        )
        .await,
        1
    );
}

#[tokio::test]
async fn remove_target_deep_deletes_semester_courses_and_syllabi() {
    let (fx, sem1, _, _) = deep_fixture().await;

    engine::share(
        &fx.pool,
        &fx.activity(),
        ArtifactKind::Semester,
        sem1,
        &[fx.dept2, fx.dept3],
    )
    .await
    .unwrap();

    let copy = semesters::find_copy_by_number(&fx.pool, fx.reg2, 3, fx.dept1)
        .await
        .unwrap()
        .unwrap();

    let outcome = engine::remove_targets(
        &fx.pool,
        &fx.activity(),
        ArtifactKind::Semester,
        sem1,
        &[fx.dept2],
    )
    .await
    .unwrap();
    assert_eq!(outcome.removed, vec![fx.dept2]);
    assert!(!outcome.now_unique);

    // Replica semester and its curriculum links are gone
    assert!(semesters::fetch_by_id(&fx.pool, copy.id).await.unwrap().is_none());
    assert_eq!(
        count(&fx.pool, "curriculum_courses", &format!("semester_id = {}", copy.id)).await,
        0
    );

    // Carried courses gone: only D1's originals and D3's copies remain
    assert_eq!(count(&fx.pool, "courses", "").await, 4);
    // D2-side syllabus subtrees gone with them
    assert_eq!(count(&fx.pool, "syllabus_models", "").await, 4);
    assert_eq!(count(&fx.pool, "syllabus_topics", "").await, 8);

    // Ledger rows for D2 (semester and courses) are gone, D3's remain
    assert_eq!(
        count(&fx.pool, "sharing_tracking", &format!("target_department_id = {}", fx.dept2)).await,
        0
    );
    assert_eq!(
        count(&fx.pool, "sharing_tracking", &format!("target_department_id = {}", fx.dept3)).await,
        3
    );

    // Source stays CLUSTER because D3 still holds a copy
    let source = semesters::fetch_by_id(&fx.pool, sem1).await.unwrap().unwrap();
    assert_eq!(source.visibility, Visibility::Cluster);
}

#[tokio::test]
async fn delete_source_semester_cascades_its_own_courses() {
    let (fx, sem1, cs301, _) = deep_fixture().await;

    // CS301 is also offered in D1's semester 5; it must survive
    let sem5 = seed_semester(&fx.pool, fx.reg1, 5).await;
    courses::link_course_to_semester(&fx.pool, fx.reg1, sem5, cs301)
        .await
        .unwrap();

    engine::share(&fx.pool, &fx.activity(), ArtifactKind::Semester, sem1, &[])
        .await
        .unwrap();
    engine::delete_source(&fx.pool, &fx.activity(), ArtifactKind::Semester, sem1)
        .await
        .unwrap();

    // Copies and the source semester are gone; CS301 kept its other link
    assert!(semesters::fetch_by_id(&fx.pool, sem1).await.unwrap().is_none());
    assert!(courses::fetch_by_id(&fx.pool, cs301).await.unwrap().is_some());
    assert_eq!(count(&fx.pool, "courses", "").await, 1);
    assert_eq!(count(&fx.pool, "curriculum_courses", "").await, 1);
    assert_eq!(count(&fx.pool, "syllabus_models", "").await, 1);
    assert_eq!(count(&fx.pool, "sharing_tracking", "").await, 0);

    // The surviving course still resolves to an owner
    assert!(
        crp_server::sharing::ownership::assert_owner(&fx.pool, ArtifactKind::Course, cs301)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn full_unshare_restores_pre_share_row_counts() {
    let (fx, sem1, _, _) = deep_fixture().await;

    let courses_before = count(&fx.pool, "courses", "").await;
    let models_before = count(&fx.pool, "syllabus_models", "").await;
    let links_before = count(&fx.pool, "curriculum_courses", "").await;

    engine::share(&fx.pool, &fx.activity(), ArtifactKind::Semester, sem1, &[])
        .await
        .unwrap();
    let outcome = engine::unshare(&fx.pool, &fx.activity(), ArtifactKind::Semester, sem1)
        .await
        .unwrap();
    assert!(outcome.now_unique);

    assert_eq!(count(&fx.pool, "courses", "").await, courses_before);
    assert_eq!(count(&fx.pool, "syllabus_models", "").await, models_before);
    assert_eq!(count(&fx.pool, "curriculum_courses", "").await, links_before);
    assert_eq!(count(&fx.pool, "sharing_tracking", "").await, 0);

    let source = semesters::fetch_by_id(&fx.pool, sem1).await.unwrap().unwrap();
    assert_eq!(source.visibility, Visibility::Unique);
}
