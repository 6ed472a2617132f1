//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tower::ServiceExt;

use renderhub_cache::CacheStore;
use renderhub_core::config::AppConfig;
use renderhub_core::error::AppError;
use renderhub_core::result::AppResult;
use renderhub_core::traits::{Clock, ManualClock, ProgressSink, RenderOutput, Renderer};
use renderhub_entity::job::JobStatus;
use renderhub_worker::render::JsonLinesRenderer;
use renderhub_worker::{JobRegistry, Reaper, RenderExecutor, Scheduler};

/// Renders `"rendered:<payload>"` as a PDF once a permit is released.
///
/// Tracks how many renders run at once so tests can check the pool bound.
#[derive(Debug)]
pub struct GatedRenderer {
    gate: Arc<Semaphore>,
    running: AtomicUsize,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Renderer for GatedRenderer {
    fn mode(&self) -> &str {
        "batch"
    }

    async fn render(
        &self,
        payload: &Value,
        mode: &str,
        progress: &dyn ProgressSink,
    ) -> AppResult<RenderOutput> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        progress.report(1, 4, mode);

        let permit = self.gate.acquire().await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        let permit = permit.map_err(|_| AppError::render("gate closed"))?;
        permit.forget();

        progress.report(4, 4, mode);
        let file_name = payload
            .get("fileName")
            .and_then(Value::as_str)
            .unwrap_or("report.pdf")
            .to_string();
        Ok(RenderOutput {
            bytes: Bytes::from(expected_bytes(payload)),
            file_name,
            content_type: "application/pdf".to_string(),
        })
    }
}

/// Always fails.
#[derive(Debug)]
pub struct BrokenRenderer;

#[async_trait]
impl Renderer for BrokenRenderer {
    fn mode(&self) -> &str {
        "broken"
    }

    async fn render(
        &self,
        _payload: &Value,
        _mode: &str,
        _progress: &dyn ProgressSink,
    ) -> AppResult<RenderOutput> {
        Err(AppError::render("template exploded"))
    }
}

/// Bytes the gated renderer produces for `payload`.
pub fn expected_bytes(payload: &Value) -> Vec<u8> {
    format!("rendered:{payload}").into_bytes()
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    pub scheduler: Arc<Scheduler>,
    pub registry: Arc<JobRegistry>,
    pub cache: Arc<CacheStore>,
    pub clock: Arc<ManualClock>,
    pub config: AppConfig,
    /// Peak number of simultaneous gated renders
    pub peak: Arc<AtomicUsize>,
    gate: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    runner: Option<JoinHandle<()>>,
    _dir: tempfile::TempDir,
}

impl TestApp {
    /// Create a new test application with two workers
    pub async fn new() -> Self {
        Self::with_concurrency(2).await
    }

    /// Create a new test application with `concurrency` workers
    pub async fn with_concurrency(concurrency: usize) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.cache.directory = dir.path().to_string_lossy().to_string();
        config.server.public_base_url = "http://renderhub.test".to_string();
        config.worker.concurrency = concurrency;
        config.worker.shutdown_grace_seconds = 1;

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let dyn_clock: Arc<dyn Clock> = clock.clone();

        let cache = Arc::new(
            CacheStore::open(&config.cache, Arc::clone(&dyn_clock))
                .await
                .expect("Failed to open cache"),
        );

        let gate = Arc::new(Semaphore::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut executor = RenderExecutor::new();
        executor.register(Arc::new(GatedRenderer {
            gate: Arc::clone(&gate),
            running: AtomicUsize::new(0),
            peak: Arc::clone(&peak),
        }));
        executor.register(Arc::new(BrokenRenderer));
        executor.register(Arc::new(JsonLinesRenderer::new("jsonl")));

        let registry = Arc::new(JobRegistry::new());
        let (scheduler, runner) = Scheduler::new(
            &config.worker,
            executor,
            Arc::clone(&registry),
            Arc::clone(&cache),
            dyn_clock,
        );
        let scheduler = Arc::new(scheduler);

        let (shutdown, shutdown_rx) = watch::channel(false);
        let runner = tokio::spawn(runner.run(shutdown_rx));

        let state = renderhub_api::AppState::new(
            Arc::new(config.clone()),
            Arc::clone(&scheduler),
            Arc::clone(&cache),
        );
        let router = renderhub_api::build_router(state);

        Self {
            router,
            scheduler,
            registry,
            cache,
            clock,
            config,
            peak,
            gate,
            shutdown,
            runner: Some(runner),
            _dir: dir,
        }
    }

    /// Let `n` gated renders finish
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Reaper over this app's cache and registry
    pub fn reaper(&self) -> Reaper {
        let clock: Arc<dyn Clock> = self.clock.clone();
        Reaper::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.registry),
            self.config.reaper.clone(),
            clock,
        )
    }

    /// Signal the worker pool to stop without waiting
    pub fn begin_shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Signal the worker pool to stop and wait for it
    pub async fn shutdown(&mut self) {
        self.begin_shutdown();
        if let Some(runner) = self.runner.take() {
            tokio::time::timeout(StdDuration::from_secs(5), runner)
                .await
                .expect("Worker pool did not stop")
                .expect("Worker pool panicked");
        }
    }

    /// Poll a job until `pred` holds
    pub async fn wait_for(&self, job_id: &str, pred: impl Fn(&JobStatus) -> bool) -> JobStatus {
        for _ in 0..500 {
            let status = self
                .scheduler
                .get_status(job_id)
                .expect("Job disappeared while waiting");
            if pred(&status) {
                return status;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        panic!("Job {job_id} never reached the expected state");
    }

    /// Make an HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();
        self.raw_request(method, path, body_str).await
    }

    /// Make an HTTP request with a literal body
    pub async fn raw_request(&self, method: &str, path: &str, body: String) -> TestResponse {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Raw body
    pub bytes: Bytes,
    /// Parsed JSON body, `Null` when the body is not JSON
    pub body: Value,
}

impl TestResponse {
    /// Header value as a string, if present
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
