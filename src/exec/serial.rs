//! # Serial executor: single worker draining an unbounded job channel.
//!
//! [`SerialExecutor`] is the provided [`Executor`] implementation: submitted
//! jobs go into an unbounded mpsc channel drained by one spawned worker task
//! that awaits each job to completion before taking the next.
//!
//! ## Diagram
//! ```text
//!   submit(job) ──► [unbounded mpsc] ──► worker: while recv() { job.await }
//! ```
//!
//! ## Properties
//! - FIFO: jobs run in submission order.
//! - Serialized: at most one job runs at a time.
//! - `submit` never blocks (unbounded channel).
//! - Dropping the executor closes the channel; the worker exits after
//!   finishing jobs already received.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::executor::{Executor, Job};

/// Single-worker sequential executor backed by an unbounded channel.
pub struct SerialExecutor {
    tx: mpsc::UnboundedSender<Job>,
}

impl SerialExecutor {
    /// Creates the executor and spawns its worker on the current runtime.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn() -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
        });
        Arc::new(Self { tx })
    }
}

impl Executor for SerialExecutor {
    /// Queues the job on the worker channel.
    ///
    /// If the worker is gone (runtime shutting down) the job is dropped.
    fn submit(&self, job: Job) {
        let _ = self.tx.send(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use futures::FutureExt;

    #[tokio::test]
    async fn test_jobs_run_in_submission_order() {
        let exec = SerialExecutor::spawn();
        let log: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        for i in 0..4 {
            let log = Arc::clone(&log);
            exec.submit(async move { log.lock().unwrap().push(i) }.boxed());
        }

        // Give the worker a chance to drain.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
    }
}
