//! End-to-end job lifecycle tests: scheduler, worker pool, cache and reaper.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde_json::json;

use renderhub_cache::CacheStore;
use renderhub_core::traits::{Clock, ManualClock};
use renderhub_entity::job::JobState;
use renderhub_worker::SubmitRequest;

use helpers::{TestApp, expected_bytes};

fn batch(job_id: Option<&str>, payload: serde_json::Value, hash: Option<&str>) -> SubmitRequest {
    SubmitRequest {
        job_id: job_id.map(str::to_string),
        payload,
        processing_mode: "batch".to_string(),
        result_hash: hash.map(str::to_string),
    }
}

#[tokio::test]
async fn test_batch_job_lifecycle_ends_in_cache() {
    let app = TestApp::new().await;
    let payload = json!({"rows": [1, 2, 3], "fileName": "q3.pdf"});

    let id = app
        .scheduler
        .submit(batch(Some("q3-report"), payload.clone(), Some("abc123")))
        .unwrap();
    assert_eq!(id.as_str(), "q3-report");

    let status = app.scheduler.get_status(id.as_str()).unwrap();
    assert_eq!(status.state, JobState::Queued);
    assert_eq!(status.processing_mode, "batch");

    app.wait_for(id.as_str(), |s| s.state == JobState::Processing)
        .await;
    assert!(app.cache.find_by_hash("abc123").await.is_none());

    app.release(1);
    let done = app
        .wait_for(id.as_str(), |s| s.state == JobState::Completed)
        .await;

    let entry = app.cache.find_by_hash("abc123").await.unwrap();
    assert_eq!(done.file_name.as_deref(), Some("q3.pdf"));
    assert_eq!(entry.original_name, "q3.pdf");
    assert_eq!(done.download_token.as_ref(), Some(&entry.download_token));
    assert_eq!(done.size_bytes, Some(entry.size_bytes));
    assert!(entry.expires_at > app.clock.now());
    assert_eq!(done.progress.percent_complete, 100.0);
    assert!(done.completed_at.is_some());

    let bytes = app
        .cache
        .get_bytes(entry.download_token.as_str())
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), expected_bytes(&payload).as_slice());

    assert!(app.scheduler.list_active().is_empty());
}

#[tokio::test]
async fn test_progress_never_moves_backwards() {
    let app = TestApp::new().await;
    let records: Vec<_> = (0..1_000).map(|i| json!({"n": i})).collect();

    let id = app
        .scheduler
        .submit(SubmitRequest {
            job_id: None,
            payload: json!({"records": records, "fileName": "rows.jsonl"}),
            processing_mode: "jsonl".to_string(),
            result_hash: None,
        })
        .unwrap();

    let mut seen = Vec::new();
    for _ in 0..5_000 {
        let status = app.scheduler.get_status(id.as_str()).unwrap();
        seen.push(status.progress.percent_complete);
        if status.state.is_terminal() {
            assert_eq!(status.state, JobState::Completed);
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(1)).await;
    }

    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.last().copied(), Some(100.0));

    let entry = app.cache.find_by_hash(id.as_str()).await.unwrap();
    assert_eq!(entry.content_type, "application/x-ndjson");
    assert_eq!(entry.original_name, "rows.jsonl");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_never_exceeds_concurrency() {
    let app = TestApp::with_concurrency(3).await;

    let ids: Vec<_> = (0..8)
        .map(|i| {
            app.scheduler
                .submit(batch(None, json!({"n": i}), None))
                .unwrap()
        })
        .collect();

    for _ in 0..20 {
        let counts = app.registry.count_by_state();
        assert!(counts.processing <= 3, "{counts:?}");
        tokio::time::sleep(StdDuration::from_millis(5)).await;
    }

    app.release(ids.len());
    for id in &ids {
        app.wait_for(id.as_str(), |s| s.state == JobState::Completed)
            .await;
    }

    assert_eq!(app.peak.load(Ordering::SeqCst), 3);
    assert_eq!(app.registry.count_by_state().completed, ids.len());
}

#[tokio::test]
async fn test_failed_job_does_not_disturb_others() {
    let app = TestApp::new().await;

    let broken = app
        .scheduler
        .submit(SubmitRequest {
            job_id: Some("broken-1".to_string()),
            payload: json!({}),
            processing_mode: "broken".to_string(),
            result_hash: Some("never-cached".to_string()),
        })
        .unwrap();
    let good = app
        .scheduler
        .submit(batch(Some("good-1"), json!({"ok": true}), Some("good-hash")))
        .unwrap();

    let failed = app
        .wait_for(broken.as_str(), |s| s.state == JobState::Failed)
        .await;
    assert!(failed.message.contains("template exploded"));
    assert!(failed.download_token.is_none());

    app.release(1);
    app.wait_for(good.as_str(), |s| s.state == JobState::Completed)
        .await;

    assert!(app.cache.find_by_hash("never-cached").await.is_none());
    assert!(app.cache.find_by_hash("good-hash").await.is_some());
}

#[tokio::test]
async fn test_reaper_expires_artifacts_and_old_jobs() {
    let app = TestApp::new().await;

    let id = app
        .scheduler
        .submit(batch(Some("old"), json!({"v": 1}), Some("h-old")))
        .unwrap();
    app.release(1);
    let done = app
        .wait_for(id.as_str(), |s| s.state == JobState::Completed)
        .await;
    let token = done.download_token.unwrap();
    let entry = app.cache.get_by_token(token.as_str()).await.unwrap();
    assert!(entry.storage_path.exists());

    let reaper = app.reaper();
    let report = reaper.run_once().await.unwrap();
    assert_eq!(report.cleanup.files_deleted, 0);
    assert_eq!(report.jobs_purged, 0);

    app.clock
        .advance(Duration::seconds(app.config.cache.ttl_seconds as i64 + 1));
    assert!(app.cache.get_by_token(token.as_str()).await.is_none());

    let report = reaper.run_once().await.unwrap();
    assert_eq!(report.cleanup.files_deleted, 1);
    assert_eq!(report.cleanup.space_freed_bytes, entry.size_bytes);
    assert!(report.cleanup.is_success());
    assert!(!entry.storage_path.exists());
    assert_eq!(app.cache.stats().await.entries, 0);

    app.clock.advance(Duration::seconds(
        app.config.reaper.job_retention_seconds as i64,
    ));
    let report = reaper.run_once().await.unwrap();
    assert_eq!(report.jobs_purged, 1);
    assert!(app.scheduler.get_status(id.as_str()).is_err());
}

#[tokio::test]
async fn test_cache_survives_reopen() {
    let app = TestApp::new().await;

    let id = app
        .scheduler
        .submit(batch(None, json!({"persist": true}), Some("persisted")))
        .unwrap();
    app.release(1);
    let done = app
        .wait_for(id.as_str(), |s| s.state == JobState::Completed)
        .await;

    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(app.clock.now()));
    let reopened = CacheStore::open(&app.config.cache, clock).await.unwrap();

    let entry = reopened.find_by_hash("persisted").await.unwrap();
    assert_eq!(Some(&entry.download_token), done.download_token.as_ref());
    let bytes = reopened
        .get_bytes(entry.download_token.as_str())
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), expected_bytes(&json!({"persist": true})).as_slice());
}

#[tokio::test]
async fn test_shutdown_fails_jobs_that_never_started() {
    let mut app = TestApp::with_concurrency(1).await;

    let running = app
        .scheduler
        .submit(batch(Some("running"), json!({}), None))
        .unwrap();
    let waiting = app
        .scheduler
        .submit(batch(Some("waiting"), json!({}), None))
        .unwrap();
    app.wait_for(running.as_str(), |s| s.state == JobState::Processing)
        .await;

    app.begin_shutdown();
    app.wait_for(waiting.as_str(), |s| s.state == JobState::Failed)
        .await;

    app.release(1);
    app.shutdown().await;

    let waiting = app.scheduler.get_status(waiting.as_str()).unwrap();
    assert_eq!(waiting.state, JobState::Failed);
    assert!(waiting.progress.started_at.is_none());
    assert_eq!(
        app.scheduler.get_status(running.as_str()).unwrap().state,
        JobState::Completed
    );
}
