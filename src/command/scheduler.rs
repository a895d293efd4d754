//! Fixed-delay scheduling for the simulated command transport
//!
//! The tracker never calls timer primitives directly; it goes through
//! this trait so tests can drive stage transitions deterministically
//! without wall-clock waits.

use futures::future::BoxFuture;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// A one-shot job to run after a fixed delay
pub type Job = BoxFuture<'static, ()>;

/// Schedules one-shot jobs. Jobs are fire-and-forget: there is no
/// cancellation path, so anything scheduled must tolerate firing against
/// state that has since moved on.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, job: Job);
}

/// Production scheduler backed by the tokio timer
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, job: Job) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        });
    }
}

/// Deterministic scheduler for tests: jobs queue with their due time and
/// only run when the test advances the clock.
pub struct ManualScheduler {
    queue: Mutex<Vec<(Duration, Job)>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Queued jobs hold no invariants across the lock, so a panic in a
    /// test body must not wedge the scheduler for the rest of the suite.
    fn queue(&self) -> MutexGuard<'_, Vec<(Duration, Job)>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run every queued job due at or before `elapsed`, in due-time order
    pub async fn run_until(&self, elapsed: Duration) {
        loop {
            let job = {
                let mut queue = self.queue();
                let due = queue
                    .iter()
                    .enumerate()
                    .filter(|(_, (at, _))| *at <= elapsed)
                    .min_by_key(|(_, (at, _))| *at)
                    .map(|(index, _)| index);

                match due {
                    Some(index) => queue.remove(index).1,
                    None => break,
                }
            };
            job.await;
        }
    }

    /// Jobs still waiting for their due time
    pub fn pending(&self) -> usize {
        self.queue().len()
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, job: Job) {
        self.queue().push((delay, job));
    }
}
