//! Detection, movement log and stats integration tests.

use axum::http::StatusCode;
use pt_api::routes;
use pt_api::state::TrackingSettings;
use serde_json::Value;
use std::time::Duration;

use super::common::{
    create_asset, create_location, create_sensor, create_test_router, create_test_state,
    delete_request, get_request, post_detection, send_request,
};

/// Sensor(exit=corridor, entry=lab), asset starting in the corridor.
async fn setup() -> (axum::Router, String, String, String, String) {
    let (app, _state) = create_test_router().await;
    let corridor = create_location(&app, "Corridor").await;
    let lab = create_location(&app, "Lab").await;
    let sensor = create_sensor(&app, "Lab door", &corridor, &lab).await;
    create_asset(&app, "EPC-100", &corridor).await;
    (app, corridor, lab, sensor, "EPC-100".to_string())
}

#[tokio::test]
async fn test_two_detections_toggle_asset() {
    let (app, corridor, lab, sensor, tag) = setup().await;

    let (status, first) = post_detection(&app, &sensor, &tag, "2024-01-01T08:00:00Z").await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["from_location_id"], corridor.as_str());
    assert_eq!(first["to_location_id"], lab.as_str());
    assert_eq!(first["kind"], "exit_to_entry");
    assert_eq!(first["status"], "valid");

    let (status, second) = post_detection(&app, &sensor, &tag, "2024-01-01T17:00:00Z").await;
    assert_eq!(status, StatusCode::CREATED, "{second}");
    assert_eq!(second["from_location_id"], lab.as_str());
    assert_eq!(second["to_location_id"], corridor.as_str());
    assert_eq!(second["kind"], "entry_to_exit");

    let asset_id = first["asset_id"].as_str().unwrap();
    let (status, asset): (StatusCode, Value) =
        send_request(app.clone(), get_request(&format!("/api/v1/assets/{asset_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["current_location_id"], corridor.as_str());
    assert_eq!(asset["version"], 2);
    assert_eq!(asset["last_seen_at"], "2024-01-01T17:00:00Z");

    let (status, history): (StatusCode, Vec<Value>) = send_request(
        app,
        get_request(&format!("/api/v1/assets/{asset_id}/movements")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["id"], first["id"]);
    assert_eq!(history[1]["id"], second["id"]);
}

#[tokio::test]
async fn test_asset_elsewhere_is_forced_to_entry() {
    let (app, _corridor, lab, sensor, _tag) = setup().await;
    let storage = create_location(&app, "Storage").await;
    create_asset(&app, "EPC-200", &storage).await;

    let (status, record) = post_detection(&app, &sensor, "EPC-200", "2024-01-01T09:00:00Z").await;

    assert_eq!(status, StatusCode::CREATED, "{record}");
    assert_eq!(record["from_location_id"], storage.as_str());
    assert_eq!(record["to_location_id"], lab.as_str());
    assert_eq!(record["kind"], "forced");
    assert_eq!(record["status"], "suspicious");
}

#[tokio::test]
async fn test_unknown_sensor_or_tag_is_not_found() {
    let (app, _corridor, _lab, sensor, tag) = setup().await;

    let (status, body) = post_detection(&app, &sensor, "NO-SUCH-TAG", "2024-01-01T09:00:00Z").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = post_detection(
        &app,
        &uuid::Uuid::new_v4().to_string(),
        &tag,
        "2024-01-01T09:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stale_detection_is_rejected() {
    let (app, _corridor, lab, sensor, tag) = setup().await;

    let (status, _) = post_detection(&app, &sensor, &tag, "2024-01-02T10:00:00Z").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post_detection(&app, &sensor, &tag, "2024-01-02T09:00:00Z").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "UNPROCESSABLE_ENTITY");

    // Nothing moved: the asset is still in the lab after one detection.
    let (_, assets): (StatusCode, Vec<Value>) =
        send_request(app, get_request("/api/v1/assets")).await;
    assert_eq!(assets[0]["current_location_id"], lab.as_str());
}

#[tokio::test]
async fn test_late_detection_within_tolerance_is_applied() {
    let state = create_test_state().await.with_tracking(TrackingSettings {
        stale_tolerance: Duration::from_secs(5),
        ..Default::default()
    });
    let app = routes::create_router(state);
    let corridor = create_location(&app, "Corridor").await;
    let lab = create_location(&app, "Lab").await;
    let sensor = create_sensor(&app, "Lab door", &corridor, &lab).await;
    create_asset(&app, "EPC-200", &corridor).await;

    // Asset was registered at 2024-01-01T00:00:00Z; this reader runs 3s behind.
    let (status, body) = post_detection(&app, &sensor, "EPC-200", "2023-12-31T23:59:57Z").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["to_location_id"], lab.as_str());
    assert!(body["occurred_at"]
        .as_str()
        .unwrap()
        .starts_with("2024-01-01T00:00:00"));

    let (status, _) = post_detection(&app, &sensor, "EPC-200", "2023-12-31T23:59:00Z").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_movement_log_filters_and_stats() {
    let (app, _corridor, _lab, sensor, tag) = setup().await;
    let storage = create_location(&app, "Storage").await;
    create_asset(&app, "EPC-300", &storage).await;

    post_detection(&app, &sensor, &tag, "2024-01-01T08:00:00Z").await;
    let (_, other) = post_detection(&app, &sensor, "EPC-300", "2024-01-01T08:30:00Z").await;
    post_detection(&app, &sensor, &tag, "2024-01-01T09:00:00Z").await;

    let (status, all): (StatusCode, Vec<Value>) =
        send_request(app.clone(), get_request("/api/v1/movements")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.len(), 3);

    let other_asset = other["asset_id"].as_str().unwrap();
    let (_, filtered): (StatusCode, Vec<Value>) = send_request(
        app.clone(),
        get_request(&format!("/api/v1/movements?asset_id={other_asset}")),
    )
    .await;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["kind"], "forced");

    let (status, stats): (StatusCode, Value) =
        send_request(app, get_request("/api/v1/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_assets"], 2);
    assert_eq!(stats["total_locations"], 3);
    assert_eq!(stats["total_sensors"], 1);
    assert_eq!(stats["total_movements"], 3);
    // Detections above are dated in the past.
    assert_eq!(stats["movements_last_24h"], 0);
}

#[tokio::test]
async fn test_sensor_with_movements_cannot_be_deleted() {
    let (app, _corridor, _lab, sensor, tag) = setup().await;
    post_detection(&app, &sensor, &tag, "2024-01-01T08:00:00Z").await;

    let (status, body): (StatusCode, Value) =
        send_request(app, delete_request(&format!("/api/v1/sensors/{sensor}"))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}
