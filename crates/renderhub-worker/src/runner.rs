//! Worker runner: the dispatch loop feeding the bounded render pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing::{error, info, warn};

use renderhub_cache::CacheStore;
use renderhub_core::config::worker::WorkerConfig;
use renderhub_core::error::{AppError, ErrorKind};
use renderhub_core::result::AppResult;
use renderhub_core::traits::{Clock, RenderOutput};
use renderhub_core::types::JobId;
use renderhub_entity::job::snapshot::MIN_ELAPSED_SECONDS;
use renderhub_entity::job::{Job, JobMetrics};

use crate::executor::RenderExecutor;
use crate::progress::JobProgressReporter;
use crate::queue::JobReceiver;
use crate::registry::JobRegistry;
use crate::shutdown::shutdown_requested;

/// Outcome of one dispatch step.
enum Dispatch {
    Spawned,
    Stopped,
}

/// Everything a worker task needs to run one job.
#[derive(Debug, Clone)]
struct WorkerContext {
    executor: Arc<RenderExecutor>,
    registry: Arc<JobRegistry>,
    cache: Arc<CacheStore>,
    clock: Arc<dyn Clock>,
    cancel: watch::Receiver<bool>,
}

/// Pulls jobs off the queue in submission order and runs each on its own
/// task, at most `concurrency` at a time.
#[derive(Debug)]
pub struct WorkerRunner {
    receiver: JobReceiver,
    executor: Arc<RenderExecutor>,
    registry: Arc<JobRegistry>,
    cache: Arc<CacheStore>,
    clock: Arc<dyn Clock>,
    config: WorkerConfig,
    /// Render slots, one permit per concurrent job.
    pool: Arc<Semaphore>,
}

impl WorkerRunner {
    pub(crate) fn new(
        receiver: JobReceiver,
        executor: Arc<RenderExecutor>,
        registry: Arc<JobRegistry>,
        cache: Arc<CacheStore>,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
    ) -> Self {
        let pool = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            receiver,
            executor,
            registry,
            cache,
            clock,
            config,
            pool,
        }
    }

    /// Run until the cancel signal is raised or the queue closes.
    ///
    /// In-flight renders are never aborted. Shutdown waits for them up to the
    /// configured grace period, and jobs still waiting in the queue are
    /// marked failed.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency.max(1);
        info!(
            concurrency,
            max_pending = ?self.config.max_pending,
            "Worker runner started"
        );

        let semaphore = Arc::clone(&self.pool);
        let backoff = Duration::from_secs(self.config.loop_backoff_seconds);
        let context = WorkerContext {
            executor: Arc::clone(&self.executor),
            registry: Arc::clone(&self.registry),
            cache: Arc::clone(&self.cache),
            clock: Arc::clone(&self.clock),
            cancel: cancel.clone(),
        };

        loop {
            match self.dispatch_next(&semaphore, &context, &mut cancel).await {
                Ok(Dispatch::Spawned) => {}
                Ok(Dispatch::Stopped) => break,
                Err(e) => {
                    error!(
                        error = %e,
                        backoff_seconds = backoff.as_secs(),
                        "Dispatch loop fault, backing off"
                    );
                    tokio::select! {
                        _ = shutdown_requested(&mut cancel) => break,
                        _ = time::sleep(backoff) => {}
                    }
                }
            }
        }

        self.abandon_queued();

        info!("Waiting for in-flight renders to complete");
        let grace = Duration::from_secs(self.config.shutdown_grace_seconds);
        let all = u32::try_from(concurrency).unwrap_or(u32::MAX);
        match time::timeout(grace, semaphore.acquire_many(all)).await {
            Ok(_) => info!("Worker runner shut down"),
            Err(_) => warn!(
                grace_seconds = grace.as_secs(),
                "Grace period elapsed with renders still running"
            ),
        }
    }

    /// Take a pool slot, then the next job, then hand both to a new task.
    ///
    /// The slot is taken first so a job never leaves the queue before it can
    /// start, which keeps dispatch in submission order.
    async fn dispatch_next(
        &mut self,
        semaphore: &Arc<Semaphore>,
        context: &WorkerContext,
        cancel: &mut watch::Receiver<bool>,
    ) -> AppResult<Dispatch> {
        let permit = tokio::select! {
            biased;
            _ = shutdown_requested(cancel) => return Ok(Dispatch::Stopped),
            permit = Arc::clone(semaphore).acquire_owned() => permit.map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Worker pool semaphore closed", e)
            })?,
        };

        let job = tokio::select! {
            biased;
            _ = shutdown_requested(cancel) => return Ok(Dispatch::Stopped),
            job = self.receiver.recv() => match job {
                Some(job) => job,
                None => {
                    info!("Job queue closed");
                    return Ok(Dispatch::Stopped);
                }
            },
        };

        let context = context.clone();
        tokio::spawn(async move {
            let _permit = permit;
            context.process(job).await;
        });
        Ok(Dispatch::Spawned)
    }

    fn abandon_queued(&mut self) {
        let left = self.receiver.drain();
        if left.is_empty() {
            return;
        }
        let now = self.clock.now();
        for job in &left {
            if let Err(e) = self.registry.update(job.id.as_str(), |s| {
                s.fail(now, "Service shut down before the job started")
            }) {
                warn!(job_id = %job.id, error = %e, "Failed to mark abandoned job");
            }
        }
        warn!(abandoned = left.len(), "Queued jobs abandoned at shutdown");
    }
}

impl WorkerContext {
    /// Run one job to a terminal state. Never returns an error: every
    /// failure ends up in the job's status.
    async fn process(self, job: Job) {
        let job_id = job.id.clone();
        let picked_up = self.clock.now();
        if let Err(e) = self.registry.update(job_id.as_str(), |s| s.start(picked_up)) {
            warn!(job_id = %job_id, error = %e, "Could not start job");
            return;
        }
        info!(job_id = %job_id, mode = %job.processing_mode, "Processing job");

        let render_started = Instant::now();
        let rendered = self.render(&job).await;
        let render_duration = render_started.elapsed();

        let outcome = match rendered {
            Ok(output) => self.finish(&job, output, picked_up, render_duration).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => info!(
                job_id = %job_id,
                render_ms = render_duration.as_millis() as u64,
                "Job completed"
            ),
            Err(e) => self.fail(&job_id, &e),
        }
    }

    /// Run the renderer on its own task so a panic fails only this job.
    async fn render(&self, job: &Job) -> AppResult<RenderOutput> {
        let reporter = JobProgressReporter::new(
            job.id.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.clock),
            self.cancel.clone(),
        );
        let executor = Arc::clone(&self.executor);
        let owned = job.clone();

        match tokio::spawn(async move { executor.execute(&owned, &reporter).await }).await {
            Ok(result) => result,
            Err(e) => Err(AppError::with_source(
                ErrorKind::Render,
                format!("Renderer for mode '{}' panicked", job.processing_mode),
                e,
            )),
        }
    }

    /// Cache the artifact and mark the job completed.
    async fn finish(
        &self,
        job: &Job,
        output: RenderOutput,
        picked_up: chrono::DateTime<chrono::Utc>,
        render_duration: Duration,
    ) -> AppResult<()> {
        let cache_started = Instant::now();
        let entry = self
            .cache
            .store(
                output.bytes,
                &output.file_name,
                &output.content_type,
                Some(job.cache_key()),
            )
            .await?;
        let cache_duration = cache_started.elapsed();

        let now = self.clock.now();
        self.registry.update(job.id.as_str(), |s| {
            let render_secs = render_duration.as_secs_f64().max(MIN_ELAPSED_SECONDS);
            let metrics = JobMetrics {
                total_duration_ms: millis_between(job.created_at, now),
                queue_wait_ms: millis_between(job.created_at, picked_up),
                render_duration_ms: render_duration.as_millis() as u64,
                cache_duration_ms: cache_duration.as_millis() as u64,
                output_size_bytes: entry.size_bytes,
                average_records_per_second: s.progress.processed_records as f64 / render_secs,
            };
            s.complete(
                now,
                entry.original_name.clone(),
                entry.download_token.clone(),
                entry.size_bytes,
                metrics,
            )
        })
    }

    fn fail(&self, job_id: &JobId, error: &AppError) {
        warn!(job_id = %job_id, kind = %error.kind, error = %error.message, "Job failed");
        let now = self.clock.now();
        if let Err(e) = self
            .registry
            .update(job_id.as_str(), |s| s.fail(now, error.message.clone()))
        {
            error!(job_id = %job_id, error = %e, "Failed to record job failure");
        }
    }
}

fn millis_between(from: chrono::DateTime<chrono::Utc>, to: chrono::DateTime<chrono::Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}
