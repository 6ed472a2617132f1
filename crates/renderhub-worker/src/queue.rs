//! In-process FIFO job queue.
//!
//! Submissions go through an mpsc channel so the dispatcher wakes as soon as
//! work arrives. An optional high-water mark turns an over-full queue into a
//! `ServiceUnavailable` error for the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;

use renderhub_core::error::AppError;
use renderhub_core::result::AppResult;
use renderhub_entity::job::Job;

/// Sending half of the job queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
    pending: Arc<AtomicUsize>,
    max_pending: Option<usize>,
}

/// Receiving half of the job queue, owned by the dispatcher.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<Job>,
    pending: Arc<AtomicUsize>,
}

impl JobQueue {
    /// Create a queue, optionally bounded to `max_pending` waiting jobs.
    pub fn new(max_pending: Option<usize>) -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        (
            Self {
                tx,
                pending: Arc::clone(&pending),
                max_pending,
            },
            JobReceiver { rx, pending },
        )
    }

    /// Append a job to the tail of the queue.
    pub fn enqueue(&self, job: Job) -> AppResult<()> {
        match self.max_pending {
            Some(max) => {
                self.pending
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                        (n < max).then_some(n + 1)
                    })
                    .map_err(|n| {
                        AppError::service_unavailable(format!(
                            "Job queue is full ({n} jobs waiting)"
                        ))
                    })?;
            }
            None => {
                self.pending.fetch_add(1, Ordering::SeqCst);
            }
        }

        if self.tx.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::service_unavailable(
                "Job queue is closed, the service is shutting down",
            ));
        }
        Ok(())
    }

    /// Jobs waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl JobReceiver {
    /// Wait for the next job. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Job> {
        let job = self.rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(job)
    }

    /// Close the queue and take every job still waiting in it.
    pub fn drain(&mut self) -> Vec<Job> {
        self.rx.close();
        let mut left = Vec::new();
        while let Ok(job) = self.rx.try_recv() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            left.push(job);
        }
        left
    }
}
