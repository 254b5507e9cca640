//! Location endpoint integration tests.

use axum::http::StatusCode;
use serde_json::{json, Value};

use super::common::{
    create_asset, create_location, create_test_router, delete_request, get_request,
    post_json_request, put_json_request, send_request, send_request_raw,
};

#[tokio::test]
async fn test_location_crud() {
    let (app, _state) = create_test_router().await;

    let id = create_location(&app, "Warehouse").await;

    let (status, body): (StatusCode, Value) =
        send_request(app.clone(), get_request(&format!("/api/v1/locations/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Warehouse");

    let (status, body): (StatusCode, Value) = send_request(
        app.clone(),
        put_json_request(
            &format!("/api/v1/locations/{id}"),
            &json!({ "name": "Main warehouse" }).to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Main warehouse");

    let (status, _) =
        send_request_raw(app.clone(), delete_request(&format!("/api/v1/locations/{id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body): (StatusCode, Value) =
        send_request(app, get_request(&format!("/api/v1/locations/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_locations_in_creation_order() {
    let (app, _state) = create_test_router().await;

    for name in ["Lab", "Corridor", "Office"] {
        create_location(&app, name).await;
    }

    // The unversioned prefix serves the same routes.
    let (status, body): (StatusCode, Vec<Value>) =
        send_request(app, get_request("/api/locations")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body.iter().filter_map(|l| l["name"].as_str()).collect();
    assert_eq!(names, vec!["Lab", "Corridor", "Office"]);
}

#[tokio::test]
async fn test_empty_name_is_rejected() {
    let (app, _state) = create_test_router().await;

    let (status, body): (StatusCode, Value) = send_request(
        app,
        post_json_request("/api/v1/locations", &json!({ "name": "" }).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["details"]["name"].is_array());
}

#[tokio::test]
async fn test_occupied_location_cannot_be_deleted() {
    let (app, _state) = create_test_router().await;

    let lab = create_location(&app, "Lab").await;
    create_asset(&app, "EPC-1", &lab).await;

    let (status, body): (StatusCode, Value) =
        send_request(app, delete_request(&format!("/api/v1/locations/{lab}"))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}
