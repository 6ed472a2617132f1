//! HTTP API integration tests.

mod helpers;

use axum::http::StatusCode;
use chrono::Duration;
use serde_json::{Value, json};

use renderhub_entity::job::JobState;

use helpers::{TestApp, expected_bytes};

/// Submit a gated batch job over HTTP and return its id.
async fn submit_batch(app: &TestApp, body: Value) -> String {
    let response = app.request("POST", "/api/jobs", Some(body)).await;
    assert_eq!(response.status, StatusCode::ACCEPTED, "{:?}", response.body);
    response.body["jobId"]
        .as_str()
        .expect("No jobId in submit response")
        .to_string()
}

#[tokio::test]
async fn test_submit_then_poll_then_download() {
    let app = TestApp::new().await;
    let payload = json!({"region": "emea", "fileName": "emea.pdf"});

    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(json!({
                "jobId": "emea-q3",
                "payload": payload,
                "processingMode": "batch",
                "resultHash": "emea-hash"
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body["jobId"], "emea-q3");
    assert_eq!(response.body["status"], "Queued");
    assert_eq!(response.body["cached"], false);
    assert!(response.body.get("downloadToken").is_none());

    let response = app.request("GET", "/api/jobs/emea-q3", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["jobId"], "emea-q3");
    assert_eq!(response.body["processingMode"], "batch");

    app.release(1);
    app.wait_for("emea-q3", |s| s.state == JobState::Completed)
        .await;

    let response = app.request("GET", "/api/jobs/emea-q3", None).await;
    assert_eq!(response.body["status"], "Completed");
    assert_eq!(response.body["fileName"], "emea.pdf");
    assert_eq!(response.body["progress"]["percent"], 100.0);
    assert!(response.body["metrics"]["outputSizeBytes"].as_u64().unwrap() > 0);
    let token = response.body["downloadToken"].as_str().unwrap().to_string();

    let download = app
        .request("GET", &format!("/api/download/{token}"), None)
        .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.header("content-type"), Some("application/pdf"));
    assert_eq!(
        download.header("content-disposition"),
        Some("attachment; filename=\"emea.pdf\"")
    );
    assert_eq!(download.bytes.as_ref(), expected_bytes(&payload).as_slice());
}

#[tokio::test]
async fn test_known_hash_short_circuits_submission() {
    let app = TestApp::new().await;
    let body = json!({
        "payload": {"n": 1},
        "processingMode": "batch",
        "resultHash": "dup-hash"
    });

    let first = submit_batch(&app, body.clone()).await;
    app.release(1);
    let done = app
        .wait_for(&first, |s| s.state == JobState::Completed)
        .await;
    let token = done.download_token.unwrap().into_inner();

    let response = app.request("POST", "/api/jobs", Some(body)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["cached"], true);
    assert_eq!(response.body["status"], "Completed");
    assert_eq!(response.body["downloadToken"], token.as_str());
    assert_eq!(
        response.body["downloadUrl"],
        format!("http://renderhub.test/api/download/{token}")
    );
    assert!(response.body.get("jobId").is_none());

    assert_eq!(app.registry.len(), 1);
}

#[tokio::test]
async fn test_cached_hash_does_not_bypass_validation() {
    let app = TestApp::new().await;

    let first = submit_batch(
        &app,
        json!({"payload": {}, "processingMode": "batch", "resultHash": "seeded-hash"}),
    )
    .await;
    app.release(1);
    app.wait_for(&first, |s| s.state == JobState::Completed)
        .await;

    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(json!({
                "jobId": "ghost",
                "payload": {},
                "processingMode": "no-such-mode",
                "resultHash": "seeded-hash"
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");

    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(json!({"payload": {}, "processingMode": "", "resultHash": "seeded-hash"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // A valid caller id on a cache hit is not echoed: no job was created.
    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(json!({
                "jobId": "ghost",
                "payload": {},
                "processingMode": "batch",
                "resultHash": "seeded-hash"
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["cached"], true);
    assert!(response.body.get("jobId").is_none());

    let response = app.request("GET", "/api/jobs/ghost", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.registry.len(), 1);
}

#[tokio::test]
async fn test_cache_lookup_by_hash() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/cache/lookup-hash", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");

    let id = submit_batch(
        &app,
        json!({
            "payload": {"fileName": "lookup.pdf"},
            "processingMode": "batch",
            "resultHash": "lookup-hash"
        }),
    )
    .await;
    app.release(1);
    app.wait_for(&id, |s| s.state == JobState::Completed).await;

    let response = app.request("GET", "/api/cache/lookup-hash", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["hash"], "lookup-hash");
    assert_eq!(response.body["fileName"], "lookup.pdf");
    assert_eq!(response.body["contentType"], "application/pdf");
    let token = response.body["downloadToken"].as_str().unwrap();
    assert_eq!(
        response.body["downloadUrl"],
        format!("http://renderhub.test/api/download/{token}")
    );
}

#[tokio::test]
async fn test_expired_artifact_is_gone() {
    let app = TestApp::new().await;

    let id = submit_batch(
        &app,
        json!({"payload": {}, "processingMode": "batch", "resultHash": "short-lived"}),
    )
    .await;
    app.release(1);
    let done = app.wait_for(&id, |s| s.state == JobState::Completed).await;
    let token = done.download_token.unwrap().into_inner();

    app.clock
        .advance(Duration::seconds(app.config.cache.ttl_seconds as i64));

    let download = app
        .request("GET", &format!("/api/download/{token}"), None)
        .await;
    assert_eq!(download.status, StatusCode::NOT_FOUND);

    let lookup = app.request("GET", "/api/cache/short-lived", None).await;
    assert_eq!(lookup.status, StatusCode::NOT_FOUND);

    // An expired hash no longer short-circuits.
    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(json!({"payload": {}, "processingMode": "batch", "resultHash": "short-lived"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body["cached"], false);
}

#[tokio::test]
async fn test_list_active_jobs() {
    let app = TestApp::with_concurrency(1).await;

    let first = submit_batch(&app, json!({"payload": {"n": 1}, "processingMode": "batch"})).await;
    let second = submit_batch(&app, json!({"payload": {"n": 2}, "processingMode": "batch"})).await;
    app.wait_for(&first, |s| s.state == JobState::Processing)
        .await;

    let response = app.request("GET", "/api/jobs", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["totalActiveJobs"], 2);
    let jobs = response.body["jobs"].as_array().unwrap();
    let states: Vec<_> = jobs.iter().map(|j| j["status"].as_str().unwrap()).collect();
    assert!(states.contains(&"Processing"));
    assert!(states.contains(&"Queued"));

    app.release(2);
    app.wait_for(&second, |s| s.state == JobState::Completed)
        .await;

    let response = app.request("GET", "/api/jobs", None).await;
    assert_eq!(response.body["totalActiveJobs"], 0);
    assert_eq!(response.body["jobs"], json!([]));
}

#[tokio::test]
async fn test_rejects_invalid_requests() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(json!({"payload": {}, "processingMode": "telepathy"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");

    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(json!({"payload": {}, "processingMode": "batch", "jobId": "../etc"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .raw_request("POST", "/api/jobs", "{not json".to_string())
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request("POST", "/api/jobs", Some(json!({"payload": {}})))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn test_duplicate_job_id_conflicts() {
    let app = TestApp::new().await;
    let body = json!({"jobId": "same", "payload": {}, "processingMode": "batch"});

    submit_batch(&app, body.clone()).await;
    let response = app.request("POST", "/api/jobs", Some(body)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/jobs/nope", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.request("GET", "/api/download/not-a-token", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Download not found or expired");
}

#[tokio::test]
async fn test_failed_job_reports_error_message() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(json!({"jobId": "doomed", "payload": {}, "processingMode": "broken"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    app.wait_for("doomed", |s| s.state == JobState::Failed).await;
    let response = app.request("GET", "/api/jobs/doomed", None).await;
    assert_eq!(response.body["status"], "Failed");
    assert_eq!(response.body["message"], "template exploded");
    assert!(response.body.get("downloadToken").is_none());
}

#[tokio::test]
async fn test_health_reports_scheduler_and_cache() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["scheduler"]["concurrency"], 2);
    assert_eq!(response.body["cache"]["entries"], 0);
}
