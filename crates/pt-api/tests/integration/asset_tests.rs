//! Asset endpoint integration tests.

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use super::common::{
    create_asset, create_location, create_test_router, delete_request, get_request,
    post_json_request, put_json_request, send_request, send_request_raw,
};

#[tokio::test]
async fn test_create_and_get_asset() {
    let (app, _state) = create_test_router().await;
    let lab = create_location(&app, "Lab").await;

    let id = create_asset(&app, "EPC-0001", &lab).await;

    let (status, body): (StatusCode, Value) =
        send_request(app, get_request(&format!("/api/v1/assets/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["external_tag"], "EPC-0001");
    assert_eq!(body["current_location_id"], lab.as_str());
    assert_eq!(body["version"], 0);
}

#[tokio::test]
async fn test_epc_alias_is_accepted() {
    let (app, _state) = create_test_router().await;
    let lab = create_location(&app, "Lab").await;

    let payload = json!({ "epc": "E200-3412", "name": "Projector", "location_id": lab });
    let (status, body): (StatusCode, Value) = send_request(
        app,
        post_json_request("/api/v1/assets", &payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["external_tag"], "E200-3412");
}

#[tokio::test]
async fn test_duplicate_tag_conflicts_and_creates_nothing() {
    let (app, _state) = create_test_router().await;
    let lab = create_location(&app, "Lab").await;
    create_asset(&app, "EPC-DUP", &lab).await;

    let payload = json!({ "external_tag": "EPC-DUP", "name": "Second", "location_id": lab });
    let (status, body): (StatusCode, Value) = send_request(
        app.clone(),
        post_json_request("/api/v1/assets", &payload.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (_, assets): (StatusCode, Vec<Value>) =
        send_request(app, get_request("/api/v1/assets")).await;
    assert_eq!(assets.len(), 1);
}

#[tokio::test]
async fn test_unknown_initial_location_is_not_found() {
    let (app, _state) = create_test_router().await;

    let payload = json!({
        "external_tag": "EPC-X",
        "name": "Orphan",
        "location_id": Uuid::new_v4(),
    });
    let (status, _body): (StatusCode, Value) = send_request(
        app,
        post_json_request("/api/v1/assets", &payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_renames_and_bumps_version() {
    let (app, _state) = create_test_router().await;
    let lab = create_location(&app, "Lab").await;
    let id = create_asset(&app, "EPC-2", &lab).await;

    let (status, body): (StatusCode, Value) = send_request(
        app,
        put_json_request(
            &format!("/api/v1/assets/{id}"),
            &json!({ "name": "Renamed" }).to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["version"], 1);
    assert_eq!(body["current_location_id"], lab.as_str());
}

#[tokio::test]
async fn test_delete_asset_then_history_is_not_found() {
    let (app, _state) = create_test_router().await;
    let lab = create_location(&app, "Lab").await;
    let id = create_asset(&app, "EPC-3", &lab).await;

    let (status, _) =
        send_request_raw(app.clone(), delete_request(&format!("/api/v1/assets/{id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) =
        send_request_raw(app.clone(), delete_request(&format!("/api/v1/assets/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        send_request_raw(app, get_request(&format!("/api/v1/assets/{id}/movements"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
