mod support;

use serde_json::json;

fn zone_payload() -> serde_json::Value {
    json!({
        "center": { "lat_deg": 52.52, "lon_deg": 13.405 },
        "initial_radius_m": 300.0,
        "damage_per_second": 15.0,
        "phases": [
            { "target_radius_m": 150.0, "wait_secs": 60, "shrink_secs": 60 },
            { "target_radius_m": 75.0, "wait_secs": 30, "shrink_secs": 30 }
        ]
    })
}

#[tokio::test]
async fn test_session_creation() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let session_id = format!("test-{}", uuid::Uuid::new_v4());
    let payload = json!({
        "session_id": session_id,
        "zone": zone_payload()
    });

    let res = client
        .post(format!("{base_url}/sessions"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::CREATED)
}

#[tokio::test]
async fn test_duplicate_session_is_rejected() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let session_id = format!("test-{}", uuid::Uuid::new_v4());
    let payload = json!({
        "session_id": session_id,
        "zone": zone_payload()
    });

    let first = client
        .post(format!("{base_url}/sessions"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(first.status(), reqwest::StatusCode::CREATED);

    let second = client
        .post(format!("{base_url}/sessions"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(second.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_non_shrinking_zone_is_rejected() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let payload = json!({
        "session_id": format!("test-{}", uuid::Uuid::new_v4()),
        "zone": {
            "center": { "lat_deg": 52.52, "lon_deg": 13.405 },
            "initial_radius_m": 300.0,
            "damage_per_second": 15.0,
            "phases": [
                { "target_radius_m": 150.0, "wait_secs": 60, "shrink_secs": 60 },
                // Radius grows again: invalid phase sequence.
                { "target_radius_m": 200.0, "wait_secs": 30, "shrink_secs": 30 }
            ]
        }
    });

    let res = client
        .post(format!("{base_url}/sessions"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.expect("error body should be json");
    assert!(
        body["error"]
            .as_str()
            .expect("error should be a string")
            .contains("invalid zone")
    );
}

#[tokio::test]
async fn test_empty_phase_list_is_rejected() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let payload = json!({
        "session_id": format!("test-{}", uuid::Uuid::new_v4()),
        "zone": {
            "center": { "lat_deg": 52.52, "lon_deg": 13.405 },
            "initial_radius_m": 300.0,
            "damage_per_second": 15.0,
            "phases": []
        }
    });

    let res = client
        .post(format!("{base_url}/sessions"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_deletion() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let session_id = format!("test-{}", uuid::Uuid::new_v4());
    let payload = json!({
        "session_id": session_id,
        "zone": zone_payload()
    });

    let created = client
        .post(format!("{base_url}/sessions"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(created.status(), reqwest::StatusCode::CREATED);

    let deleted = client
        .delete(format!("{base_url}/sessions/{session_id}"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);

    // A second delete finds nothing.
    let missing = client
        .delete(format!("{base_url}/sessions/{session_id}"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_default_session_cannot_be_deleted() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let res = client
        .delete(format!("{base_url}/sessions/training"))
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);
}
