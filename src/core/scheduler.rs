// src/core/scheduler.rs

//! A single-worker cooperative job executor dedicated to one connector
//! instance.
//!
//! All discovery and sync jobs of a connector funnel through one queue and
//! run on one worker task, so no two jobs of the same connector ever overlap.
//! That serialization is the only synchronization the reconciliation state
//! relies on. Each job runs under the connector's admin timeout; a job that
//! exceeds it is cancelled and logged, never propagated.

use crate::core::errors::MirrorError;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// The future a job produces for one run.
pub type JobFuture = BoxFuture<'static, Result<(), MirrorError>>;

/// A job the scheduler can run repeatedly: each invocation produces a fresh
/// future for one run.
pub type Job = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// Pending runs beyond this are skipped, not buffered without bound. A full
/// queue means the worker is already behind by several admin timeouts.
const QUEUE_CAPACITY: usize = 64;

struct QueuedJob {
    job: Job,
    description: String,
}

/// The per-connector executor. Dropped or closed, it stops its timers and
/// refuses further work.
pub struct Scheduler {
    name: String,
    admin_timeout: Duration,
    queue_tx: Mutex<Option<mpsc::Sender<QueuedJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    timers: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Scheduler {
    /// Spawns the worker task. `admin_timeout` bounds each job run and the
    /// drain performed by [`Scheduler::close`].
    pub fn new(name: impl Into<String>, admin_timeout: Duration) -> Self {
        let name = name.into();
        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
        let worker = tokio::spawn(run_worker(name.clone(), admin_timeout, queue_rx));
        Self {
            name,
            admin_timeout,
            queue_tx: Mutex::new(Some(queue_tx)),
            worker: Mutex::new(Some(worker)),
            timers: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn admin_timeout(&self) -> Duration {
        self.admin_timeout
    }

    /// Enqueues a single run of `job`.
    pub fn execute(&self, job: Job, description: &str) {
        self.enqueue(job, description);
    }

    /// Runs `job` now and then once every `period`.
    pub fn schedule_repeating(&self, job: Job, period: Duration, description: &str) {
        self.schedule_with_initial_delay(job, period, Duration::ZERO, description);
    }

    /// Runs `job` once every `period`, starting one `period` from now.
    pub fn schedule_repeating_delayed(&self, job: Job, period: Duration, description: &str) {
        self.schedule_with_initial_delay(job, period, period, description);
    }

    fn schedule_with_initial_delay(
        &self,
        job: Job,
        period: Duration,
        initial_delay: Duration,
        description: &str,
    ) {
        if period.is_zero() {
            warn!(
                "{}: refusing to schedule '{}' with a zero period.",
                self.name, description
            );
            return;
        }
        if self.closed.load(Ordering::SeqCst) {
            warn!(
                "{}: scheduler is closed; not scheduling '{}'.",
                self.name, description
            );
            return;
        }
        let Some(queue_tx) = self.queue_tx.lock().as_ref().cloned() else {
            return;
        };
        let name = self.name.clone();
        let description = description.to_string();
        let timer = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + initial_delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let queued = QueuedJob {
                    job: job.clone(),
                    description: description.clone(),
                };
                match queue_tx.try_send(queued) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!(
                            "{name}: previous run of '{description}' is still pending; skipping this tick."
                        );
                    }
                    Err(TrySendError::Closed(_)) => return,
                }
            }
        });
        self.timers.lock().push(timer);
    }

    fn enqueue(&self, job: Job, description: &str) {
        if self.closed.load(Ordering::SeqCst) {
            warn!(
                "{}: scheduler is closed; refusing to run '{}'.",
                self.name, description
            );
            return;
        }
        let guard = self.queue_tx.lock();
        let Some(queue_tx) = guard.as_ref() else {
            return;
        };
        let queued = QueuedJob {
            job,
            description: description.to_string(),
        };
        match queue_tx.try_send(queued) {
            Ok(()) => {}
            Err(TrySendError::Full(rejected)) => {
                warn!(
                    "{}: job queue is full; dropping '{}'.",
                    self.name, rejected.description
                );
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Stops the timers, refuses new work, and lets the worker drain whatever
    /// is already queued, up to the admin timeout. An in-flight job that does
    /// not finish in time is aborted.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for timer in self.timers.lock().drain(..) {
            timer.abort();
        }
        self.queue_tx.lock().take();
        let worker = self.worker.lock().take();
        if let Some(mut handle) = worker {
            if time::timeout(self.admin_timeout, &mut handle).await.is_err() {
                warn!(
                    "{}: in-flight job did not finish within {:?}; aborting worker.",
                    self.name, self.admin_timeout
                );
                handle.abort();
            }
        }
        debug!("{}: scheduler closed.", self.name);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for timer in self.timers.get_mut().drain(..) {
            timer.abort();
        }
        if let Some(worker) = self.worker.get_mut().take() {
            worker.abort();
        }
    }
}

/// One queue, one worker: jobs run strictly in order, never concurrently.
async fn run_worker(name: String, admin_timeout: Duration, mut queue_rx: mpsc::Receiver<QueuedJob>) {
    while let Some(queued) = queue_rx.recv().await {
        debug!("{name}: running '{}'.", queued.description);
        match time::timeout(admin_timeout, (queued.job)()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                // Reconciliation faults are retried on the next tick.
                warn!("{name}: '{}' failed: {e}", queued.description);
            }
            Err(_) => {
                warn!(
                    "{name}: '{}' exceeded the admin timeout of {:?} and was cancelled.",
                    queued.description, admin_timeout
                );
            }
        }
    }
    debug!("{name}: job queue drained; worker exiting.");
}
