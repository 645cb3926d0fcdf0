//! HTTP surface tests: visibility toggle, recipients, sharing overviews

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crp_common::ArtifactKind;
use crp_server::db::{clusters, departments, text_items};
use crp_server::{build_router, AppState};

async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn visibility_toggle_shares_mission_to_all_peers() {
    let fx = helpers::cluster_fixture().await;
    let state = fx.state();
    let item_id = text_items::insert(&fx.pool, ArtifactKind::Mission, fx.dept1, "Serve society", 0)
        .await
        .unwrap();

    let (status, body) = send(
        &state,
        "PUT",
        "/item/visibility",
        Some(json!({
            "item_type": "mission",
            "item_id": item_id,
            "visibility": "CLUSTER",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["visibility"], "CLUSTER");

    for dept in [fx.dept2, fx.dept3] {
        let items = text_items::fetch_by_department(&fx.pool, ArtifactKind::Mission, dept)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_department_id, Some(fx.dept1));
    }
}

#[tokio::test]
async fn visibility_change_on_received_copy_is_forbidden() {
    let fx = helpers::cluster_fixture().await;
    let state = fx.state();
    let item_id = text_items::insert(&fx.pool, ArtifactKind::Peos, fx.dept1, "Lead teams", 0)
        .await
        .unwrap();
    send(
        &state,
        "PUT",
        "/item/visibility",
        Some(json!({
            "item_type": "peos",
            "item_id": item_id,
            "visibility": "CLUSTER",
        })),
    )
    .await;

    let copies = text_items::fetch_by_department(&fx.pool, ArtifactKind::Peos, fx.dept2)
        .await
        .unwrap();
    let copy_id = copies[0].id;

    let (status, body) = send(
        &state,
        "PUT",
        "/item/visibility",
        Some(json!({
            "item_type": "peos",
            "item_id": copy_id,
            "visibility": "UNIQUE",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "NOT_OWNER");
    assert_eq!(
        body["error"]["message"],
        "Cannot change visibility of received items"
    );
}

#[tokio::test]
async fn unknown_item_type_and_visibility_are_rejected() {
    let fx = helpers::cluster_fixture().await;
    let state = fx.state();

    let (status, body) = send(
        &state,
        "PUT",
        "/item/visibility",
        Some(json!({
            "item_type": "vision",
            "item_id": 1,
            "visibility": "CLUSTER",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send(
        &state,
        "PUT",
        "/item/visibility",
        Some(json!({
            "item_type": "mission",
            "item_id": 1,
            "visibility": "PUBLIC",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sharing_a_missing_item_returns_not_found() {
    let fx = helpers::cluster_fixture().await;
    let state = fx.state();

    let (status, body) = send(
        &state,
        "PUT",
        "/item/visibility",
        Some(json!({
            "item_type": "mission",
            "item_id": 999,
            "visibility": "CLUSTER",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn sharing_from_unclustered_department_conflicts() {
    let fx = helpers::cluster_fixture().await;
    let state = fx.state();

    let lone_reg = departments::create_regulation(&fx.pool, "CIVIL 2022", "2022-2023", 160)
        .await
        .unwrap();
    let lone_dept = departments::create_department(&fx.pool, lone_reg, "Vision CIVIL")
        .await
        .unwrap();
    let item_id = text_items::insert(&fx.pool, ArtifactKind::Mission, lone_dept, "Build well", 0)
        .await
        .unwrap();

    let (status, body) = send(
        &state,
        "PUT",
        "/item/visibility",
        Some(json!({
            "item_type": "mission",
            "item_id": item_id,
            "visibility": "CLUSTER",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NOT_IN_CLUSTER");
}

#[tokio::test]
async fn add_and_remove_modes_require_explicit_targets() {
    let fx = helpers::cluster_fixture().await;
    let state = fx.state();
    let item_id = text_items::insert(&fx.pool, ArtifactKind::Pos, fx.dept1, "Apply knowledge", 0)
        .await
        .unwrap();

    for mode in ["add", "remove"] {
        let (status, body) = send(
            &state,
            "PUT",
            "/item/visibility",
            Some(json!({
                "item_type": "pos",
                "item_id": item_id,
                "visibility": "CLUSTER",
                "sharing_mode": mode,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "mode {}", mode);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn recipients_resolve_from_either_side() {
    let fx = helpers::cluster_fixture().await;
    let state = fx.state();
    let item_id = text_items::insert(&fx.pool, ArtifactKind::Psos, fx.dept1, "Design circuits", 0)
        .await
        .unwrap();
    send(
        &state,
        "PUT",
        "/item/visibility",
        Some(json!({
            "item_type": "psos",
            "item_id": item_id,
            "visibility": "CLUSTER",
            "target_departments": [fx.dept2],
        })),
    )
    .await;

    // From the source side
    let (status, body) = send(
        &state,
        "GET",
        &format!("/item/psos/{}/recipients", item_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source_department_id"], fx.dept1);
    assert_eq!(body["shared_with"], json!([fx.dept2]));

    // From the copy side: resolves back to the same source
    let copies = text_items::fetch_by_department(&fx.pool, ArtifactKind::Psos, fx.dept2)
        .await
        .unwrap();
    let (status, body) = send(
        &state,
        "GET",
        &format!("/item/psos/{}/recipients", copies[0].id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source_department_id"], fx.dept1);
    assert_eq!(body["shared_with"], json!([fx.dept2]));
}

#[tokio::test]
async fn regulation_sharing_overview_flags_ownership() {
    let fx = helpers::cluster_fixture().await;
    let state = fx.state();
    let item_id = text_items::insert(&fx.pool, ArtifactKind::Mission, fx.dept1, "Own mission", 0)
        .await
        .unwrap();
    send(
        &state,
        "PUT",
        "/item/visibility",
        Some(json!({
            "item_type": "mission",
            "item_id": item_id,
            "visibility": "CLUSTER",
        })),
    )
    .await;

    // Owner side: one CLUSTER item flagged is_owner
    let (status, body) = send(
        &state,
        "GET",
        &format!("/regulation/{}/sharing", fx.reg1),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["department_id"], fx.dept1);
    assert_eq!(body["in_cluster"], true);
    assert_eq!(body["cluster_departments"].as_array().unwrap().len(), 3);
    assert_eq!(body["mission"][0]["visibility"], "CLUSTER");
    assert_eq!(body["mission"][0]["is_owner"], true);

    // Recipient side: the copy is flagged as received
    let (_, body) = send(
        &state,
        "GET",
        &format!("/regulation/{}/sharing", fx.reg2),
        None,
    )
    .await;
    assert_eq!(body["mission"][0]["is_owner"], false);
    assert_eq!(body["mission"][0]["source_department_id"], fx.dept1);

    // Unknown regulation
    let (status, _) = send(&state, "GET", "/regulation/999/sharing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cluster_shared_listing_hides_unique_content() {
    let fx = helpers::cluster_fixture().await;
    let state = fx.state();

    let shared = text_items::insert(&fx.pool, ArtifactKind::Mission, fx.dept1, "Shared", 0)
        .await
        .unwrap();
    text_items::insert(&fx.pool, ArtifactKind::Mission, fx.dept1, "Private", 1)
        .await
        .unwrap();
    send(
        &state,
        "PUT",
        "/item/visibility",
        Some(json!({
            "item_type": "mission",
            "item_id": shared,
            "visibility": "CLUSTER",
            "target_departments": [fx.dept2],
        })),
    )
    .await;

    let (status, body) = send(
        &state,
        "GET",
        &format!("/cluster/{}/shared", fx.cluster_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cluster_name"], "Engineering");

    let members = body["departments"].as_array().unwrap();
    assert_eq!(members.len(), 3);
    let d1 = members.iter().find(|m| m["department_id"] == fx.dept1).unwrap();
    let mission: Vec<&str> = d1["mission"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["text"].as_str().unwrap())
        .collect();
    assert_eq!(mission, vec!["Shared"]);

    let (status, _) = send(&state, "GET", "/cluster/999/shared", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cluster_membership_is_exclusive() {
    let fx = helpers::cluster_fixture().await;

    let second = clusters::create_cluster(&fx.pool, "Second", None).await.unwrap();
    let result = clusters::add_department(&fx.pool, second, fx.dept1).await;
    assert!(result.is_err());

    // Peer enumeration never includes the department itself
    let peers = clusters::peers_of(&fx.pool, fx.dept1).await.unwrap();
    let ids: Vec<i64> = peers.iter().map(|p| p.department_id).collect();
    assert_eq!(ids, vec![fx.dept2, fx.dept3]);
    assert!(clusters::is_peer(&fx.pool, fx.dept1, fx.dept3).await.unwrap());
}
