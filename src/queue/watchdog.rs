//! # Starvation watchdog.
//!
//! A delayed queue depends on an external actor to finish a head rebuild
//! (`complete_reset`) or to run a paired head-reset task. If that never
//! happens, queued work would wedge forever. The watchdog is the recovery
//! path: a periodic check that runs only while the queue is delayed or
//! backlogged and force-unblocks it when no task has finished for the
//! configured starvation timeout.
//!
//! ## Loop
//! ```text
//! every starvation_check_period:
//!   ├─ token cancelled            → exit
//!   ├─ not delayed, no backlog    → self-cancel, exit
//!   ├─ stalled >= timeout         → force-unblock, publish internal error,
//!   │                               drain, exit
//!   └─ otherwise                  → tick again
//! ```
//!
//! The tick body lives on [`TaskQueue`] so the check and the force-unblock
//! run under the queue's state lock; cancellation is checked under the same
//! lock, so a cancel racing a tick is a safe no-op.

use tokio_util::sync::CancellationToken;

use super::scheduler::TaskQueue;

/// Spawns the watchdog loop and returns its cancellation handle.
///
/// The handle is stored in `QueueState::watchdog`; dropping it does not stop
/// the loop, cancelling it does. Cancel-after-exit is a safe no-op.
pub(crate) fn start(queue: &TaskQueue) -> CancellationToken {
    let token = CancellationToken::new();
    let loop_token = token.clone();
    let queue = queue.clone();

    tokio::spawn(async move {
        let period = queue.starvation_check_period();
        loop {
            tokio::select! {
                _ = loop_token.cancelled() => return,
                _ = tokio::time::sleep(period) => {}
            }
            if !queue.watchdog_tick(&loop_token) {
                return;
            }
        }
    });

    token
}
