//! Periodic background valuation and hand-off of the latest outcome.
//!
//! One worker task runs jobs strictly in submission order. Every submission
//! gets a single-value mailbox ([`JobHandle`]); the handle of the most recent
//! submission sits in a mutex-guarded slot. Submitting replaces the slot and
//! enqueues the job under the same lock, so the slot never points at a job
//! that runs before one it replaced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::ValuationError;
use crate::ledger::LedgerBalanceSource;
use crate::market_data::PriceSource;
use crate::models::Setup;
use crate::valuation::{ValuationJob, ValuationOutcome};

type Mailbox = watch::Receiver<Option<Arc<ValuationOutcome>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing submitted yet.
    Idle,
    /// No outcome exists yet, or the latest outcome is available.
    Running,
    /// A newer job is pending while an earlier outcome is available.
    Refreshing,
}

/// Reader side of one submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    generation: u64,
    outcome: Mailbox,
}

impl JobHandle {
    /// Submission number, strictly increasing from 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    pub fn try_outcome(&self) -> Option<Arc<ValuationOutcome>> {
        self.outcome.borrow().clone()
    }

    /// Wait for this job's outcome.
    pub async fn wait(mut self) -> Arc<ValuationOutcome> {
        let ready = self.outcome.wait_for(Option::is_some).await;
        match ready.as_deref() {
            Ok(Some(outcome)) => Arc::clone(outcome),
            _ => Arc::new(Err(ValuationError::WorkerStopped)),
        }
    }
}

struct QueuedJob {
    generation: u64,
    job: ValuationJob,
    publish: watch::Sender<Option<Arc<ValuationOutcome>>>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    latest: Option<JobHandle>,
}

struct Shared {
    setup: Result<Arc<Setup>, ValuationError>,
    queue: mpsc::UnboundedSender<QueuedJob>,
    slot: Mutex<Slot>,
    submissions: watch::Sender<u64>,
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        // Slot updates cannot panic halfway, so a poisoned lock is still consistent.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn submit(&self, reason: &str) -> JobHandle {
        let mut slot = self.lock_slot();
        self.submit_locked(&mut slot, reason)
    }

    fn submit_locked(&self, slot: &mut Slot, reason: &str) -> JobHandle {
        slot.generation += 1;
        let generation = slot.generation;

        let (publish, outcome) = watch::channel(None);
        let queued = QueuedJob {
            generation,
            job: ValuationJob::new(self.setup.clone()),
            publish,
        };
        if self.queue.send(queued).is_err() {
            // Dropping the job closes its mailbox; readers get WorkerStopped.
            warn!(generation, "refresh worker is gone; job dropped");
        }

        let handle = JobHandle {
            generation,
            outcome,
        };
        slot.latest = Some(handle.clone());
        self.submissions.send_replace(generation);
        info!(generation, reason, "valuation job submitted");
        handle
    }
}

async fn run_worker(
    mut jobs: mpsc::UnboundedReceiver<QueuedJob>,
    prices: Arc<dyn PriceSource>,
    ledger: Arc<dyn LedgerBalanceSource>,
    completed: Arc<AtomicU64>,
) {
    while let Some(queued) = jobs.recv().await {
        let started = std::time::Instant::now();
        let outcome = queued.job.run(prices.as_ref(), ledger.as_ref()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(result) => info!(
                generation = queued.generation,
                holdings = result.holdings.len(),
                elapsed_ms,
                "valuation refresh complete"
            ),
            Err(err) => warn!(
                generation = queued.generation,
                kind = err.kind(),
                error = %err,
                elapsed_ms,
                "valuation refresh failed"
            ),
        }

        queued.publish.send_replace(Some(Arc::new(outcome)));
        // After publishing, so a pending latest job never counts itself.
        completed.store(queued.generation, Ordering::Release);
    }
    debug!("refresh worker stopped");
}

/// Runs valuation jobs on a fixed period and exposes the latest outcome.
///
/// There is no timeout here: a hung network call stalls the worker, and every
/// later read waits behind it.
pub struct RefreshScheduler {
    shared: Arc<Shared>,
    /// Generation of the most recently finished job, 0 before any.
    completed: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
    timer: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Create an idle scheduler and spawn its worker.
    ///
    /// Must be called from within a Tokio runtime. A setup that failed to load
    /// becomes the outcome of every job.
    pub fn new(
        setup: Result<Arc<Setup>, ValuationError>,
        prices: Arc<dyn PriceSource>,
        ledger: Arc<dyn LedgerBalanceSource>,
    ) -> Self {
        let (queue, jobs) = mpsc::unbounded_channel();
        let (submissions, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            setup,
            queue,
            slot: Mutex::new(Slot::default()),
            submissions,
        });
        let completed = Arc::new(AtomicU64::new(0));
        let worker = tokio::spawn(run_worker(jobs, prices, ledger, Arc::clone(&completed)));

        Self {
            shared,
            completed,
            worker: Some(worker),
            timer: None,
        }
    }

    /// Submit the first job now and another one every `period`.
    pub fn start(&mut self, period: Duration) -> JobHandle {
        let first = self.shared.submit("startup");

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let shared = Arc::clone(&self.shared);
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                shared.submit("scheduled");
            }
        }));

        first
    }

    /// Submit an out-of-band refresh.
    pub fn refresh_now(&self) -> JobHandle {
        self.shared.submit("manual")
    }

    /// Handle of the most recent submission, if any.
    pub fn latest(&self) -> Option<JobHandle> {
        self.shared.lock_slot().latest.clone()
    }

    pub fn state(&self) -> SchedulerState {
        match &self.shared.lock_slot().latest {
            None => SchedulerState::Idle,
            Some(latest) if !latest.is_complete() && self.completed.load(Ordering::Acquire) > 0 => {
                SchedulerState::Refreshing
            }
            Some(_) => SchedulerState::Running,
        }
    }

    /// Notified with the generation number of every submission.
    pub fn submissions(&self) -> watch::Receiver<u64> {
        self.shared.submissions.subscribe()
    }

    fn latest_or_submit(&self) -> JobHandle {
        let mut slot = self.shared.lock_slot();
        match &slot.latest {
            Some(handle) => handle.clone(),
            None => self.shared.submit_locked(&mut slot, "first read"),
        }
    }

    /// Outcome of the most recently submitted job, waiting for it if needed.
    ///
    /// Never returns an older outcome while a newer job is pending.
    pub async fn current(&self) -> Arc<ValuationOutcome> {
        self.latest_or_submit().wait().await
    }

    /// Blocking variant of [`current`](Self::current) for non-async threads.
    ///
    /// Must not be called from inside an async task.
    pub fn blocking_current(&self) -> Arc<ValuationOutcome> {
        futures::executor::block_on(self.current())
    }

    /// Stop the timer, let queued jobs finish, and wait for the worker.
    pub async fn shutdown(mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            let _ = timer.await;
        }
        let worker = self.worker.take();
        // Dropping the last queue sender ends the worker loop once drained.
        drop(self);

        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                warn!(error = %err, "refresh worker panicked");
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
