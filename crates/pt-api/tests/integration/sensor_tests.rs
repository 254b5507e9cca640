//! Sensor endpoint integration tests.

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use super::common::{
    create_location, create_sensor, create_test_router, get_request, post_json_request,
    put_json_request, send_request,
};

#[tokio::test]
async fn test_create_sensor_between_two_locations() {
    let (app, _state) = create_test_router().await;
    let corridor = create_location(&app, "Corridor").await;
    let lab = create_location(&app, "Lab").await;

    let id = create_sensor(&app, "Lab door", &corridor, &lab).await;

    let (status, body): (StatusCode, Value) =
        send_request(app, get_request(&format!("/api/v1/sensors/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exit_location_id"], corridor.as_str());
    assert_eq!(body["entry_location_id"], lab.as_str());
}

#[tokio::test]
async fn test_equal_sides_is_validation_error() {
    let (app, _state) = create_test_router().await;
    let lab = create_location(&app, "Lab").await;

    let payload = json!({ "name": "Loop", "exit_location_id": lab, "entry_location_id": lab });
    let (status, body): (StatusCode, Value) = send_request(
        app.clone(),
        post_json_request("/api/v1/sensors", &payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(
        body["details"]["entry_location_id"][0]["code"],
        "distinct_locations"
    );

    let (_, sensors): (StatusCode, Vec<Value>) =
        send_request(app, get_request("/api/v1/sensors")).await;
    assert!(sensors.is_empty());
}

#[tokio::test]
async fn test_unknown_location_is_not_found() {
    let (app, _state) = create_test_router().await;
    let lab = create_location(&app, "Lab").await;

    let payload = json!({
        "name": "Ghost door",
        "exit_location_id": Uuid::new_v4(),
        "entry_location_id": lab,
    });
    let (status, _body): (StatusCode, Value) = send_request(
        app,
        post_json_request("/api/v1/sensors", &payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_cannot_collapse_sides() {
    let (app, _state) = create_test_router().await;
    let corridor = create_location(&app, "Corridor").await;
    let lab = create_location(&app, "Lab").await;
    let id = create_sensor(&app, "Lab door", &corridor, &lab).await;

    let (status, _body): (StatusCode, Value) = send_request(
        app.clone(),
        put_json_request(
            &format!("/api/v1/sensors/{id}"),
            &json!({ "entry_location_id": corridor }).to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body): (StatusCode, Value) = send_request(
        app,
        put_json_request(
            &format!("/api/v1/sensors/{id}"),
            &json!({ "exit_location_id": lab, "entry_location_id": corridor }).to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exit_location_id"], lab.as_str());
    assert_eq!(body["entry_location_id"], corridor.as_str());
}
