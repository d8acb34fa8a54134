//! # TaskQueue: priority dispatch with delay gating and starvation recovery.
//!
//! [`TaskQueue`] sequences units of work onto a caller-supplied sequential
//! [`Executor`]. Work is tagged with a [`Priority`]; three FIFO lanes give
//! strict priority across classes, and a "delayed" flag gates the user and
//! background lanes until the queue is initialized and no head rebuild is
//! pending.
//!
//! ## Architecture
//! ```text
//! execute(id, priority, work)
//!      │
//!      ├─ not delayed, no backlog ──► dispatch to executor (fast path)
//!      │
//!      └─ otherwise ──► lane by priority:
//!              [immediate] ─┐          drains even while delayed
//!              [user]      ─┼─► drain ─► dispatch ─► executor
//!              [background]─┘          gated by the delayed flag
//!
//! completion hook (per wrapper variant):
//!      Init            → initialized = true
//!      HeadInvalidate  → arm starvation watchdog
//!      HeadReset       → clear head-reset wait, maybe disarm watchdog
//!      then always     → drain again
//! ```
//!
//! ## Rules
//! - `is_delayed() == !initialized || waiting_for_head_reset`.
//! - FIFO within a lane; strict priority across lanes.
//! - The scheduler never runs two tasks concurrently on its own accounting;
//!   the executor must be a sequential worker.
//! - None of the methods block: they enqueue or hand a job to the executor
//!   and return.
//! - Anomalies (duplicate head-invalidate, re-initialization, timeout races,
//!   starvation) are published on the [`Bus`] and never surface as errors.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::events::{Bus, Event, EventKind};
use crate::exec::{Executor, Job};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{Priority, TaskId};

use super::entry::{Entry, TaskKind, TimeoutGuard};
use super::state::{QueueState, QueueStats};
use super::watchdog;

/// Priority task queue over a sequential executor.
///
/// Cheap to clone; clones share one scheduler.
///
/// ## Example
/// ```rust
/// use taskgate::{Priority, QueueConfig, SerialExecutor, TaskId, TaskQueue};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let queue = TaskQueue::new(QueueConfig::default(), SerialExecutor::spawn());
///
///     queue.initialize(TaskId(0), async {
///         // load session state...
///     });
///     queue.execute(TaskId(1), Priority::Background, async {
///         // deferred cleanup...
///     });
/// }
/// ```
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

/// Shared scheduler internals: configuration, bus, executor, and the single
/// mutual-exclusion domain holding all queue state.
struct Inner {
    cfg: QueueConfig,
    bus: Bus,
    executor: Arc<dyn Executor>,
    state: Mutex<QueueState>,
}

impl Inner {
    /// Locks the state, recovering from poisoning: a panicking subscriber or
    /// task body must not wedge the scheduler.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TaskQueue {
    /// Creates a queue over the given executor.
    ///
    /// The queue starts uninitialized, hence delayed: only immediate-class
    /// tasks run until [`initialize`](TaskQueue::initialize) completes.
    pub fn new(cfg: QueueConfig, executor: Arc<dyn Executor>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            inner: Arc::new(Inner {
                cfg,
                bus,
                executor,
                state: Mutex::new(QueueState::new()),
            }),
        }
    }

    /// The diagnostic event bus. Subscribe directly, or use
    /// [`attach_subscribers`](TaskQueue::attach_subscribers).
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    /// Spawns a listener that fans bus events out to the given subscribers
    /// via a [`SubscriberSet`] (fire-and-forget).
    pub fn attach_subscribers(&self, subs: Vec<Arc<dyn Subscribe>>) {
        let mut rx = self.inner.bus.subscribe();
        let set = SubscriberSet::new(subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                }
            }
        });
    }

    /// Submits the one-time initialization task.
    ///
    /// Runs through the same dispatch path as any immediate-class task; its
    /// completion flips the queue to initialized, letting the gated lanes
    /// drain. Calling this again after initialization publishes a warning
    /// event but still runs the task.
    pub fn initialize<F>(&self, id: TaskId, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        {
            let st = self.inner.lock();
            if st.initialized {
                drop(st);
                self.inner.bus.publish(
                    Event::new(EventKind::ReinitializeWarned)
                        .with_task_id(id)
                        .with_reason(QueueError::AlreadyInitialized.as_message()),
                );
            }
        }
        self.submit(Entry::new(id, Priority::Immediate, TaskKind::Init, work.boxed()));
    }

    /// Submits a unit of work with the given priority.
    ///
    /// If the queue is not delayed and has no backlog, the work is handed to
    /// the executor inside this call; otherwise it is appended to the lane
    /// matching its priority class and waits for the drain.
    pub fn execute<F>(&self, id: TaskId, priority: Priority, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.submit(Entry::new(
            id,
            priority,
            TaskKind::for_priority(priority),
            work.boxed(),
        ));
    }

    /// Submits a unit of work with a start-deadline fallback.
    ///
    /// If `work` has not started within `timeout` of submission,
    /// `timeout_work` runs instead, dispatched straight to the executor
    /// (bypassing the lanes). Exactly one of {`work`, `timeout_work`} ever
    /// executes; the losing side publishes a warning event and is a no-op.
    pub fn execute_with_timeout<F, G>(
        &self,
        id: TaskId,
        priority: Priority,
        work: F,
        timeout_work: G,
        timeout: Duration,
    ) where
        F: Future<Output = ()> + Send + 'static,
        G: Future<Output = ()> + Send + 'static,
    {
        let guard = TimeoutGuard::new();
        self.spawn_timeout_timer(id, priority, guard.clone(), timeout_work.boxed(), timeout);
        self.submit(
            Entry::new(id, priority, TaskKind::for_priority(priority), work.boxed())
                .with_guard(guard),
        );
    }

    /// Signals that the protected head state became invalid and must be
    /// rebuilt out of band.
    ///
    /// Discards every queued (not in-flight) task in all lanes, flips the
    /// queue back to uninitialized, and arms the starvation watchdog (the
    /// queue is now necessarily delayed). Pair with
    /// [`complete_reset`](TaskQueue::complete_reset).
    pub fn reset(&self) {
        let dropped = {
            let mut st = self.inner.lock();
            st.waiting_for_head_reset = false;
            st.initialized = false;
            let dropped = st.clear_lanes();
            self.start_watchdog_locked(&mut st);
            dropped
        };
        // Discarded entries must not fire their timeout fallbacks either.
        for e in &dropped {
            if let Some(g) = &e.guard {
                g.defuse();
            }
        }
        self.inner
            .bus
            .publish(Event::new(EventKind::QueueReset).with_depth(dropped.len()));
    }

    /// Marks the out-of-band rebuild implied by [`reset`](TaskQueue::reset)
    /// finished: the queue is initialized again, the watchdog is disarmed if
    /// nothing else delays the queue, and gated work resumes draining.
    pub fn complete_reset(&self) {
        {
            let mut st = self.inner.lock();
            st.initialized = true;
            if !st.is_delayed() {
                Self::cancel_watchdog_locked(&mut st);
            }
            self.drain_locked(&mut st);
        }
        self.inner.bus.publish(Event::new(EventKind::ResetCompleted));
    }

    /// True while a head-invalidate → head-reset pairing is in progress.
    pub fn is_making_request(&self) -> bool {
        self.inner.lock().waiting_for_head_reset
    }

    /// True while only immediate-class tasks may run.
    pub fn is_delayed(&self) -> bool {
        self.inner.lock().is_delayed()
    }

    /// True when no task is queued and none is in flight.
    pub fn is_idle(&self) -> bool {
        let st = self.inner.lock();
        !st.has_backlog() && st.inflight == 0
    }

    /// True when any lane holds a queued task.
    pub fn has_backlog(&self) -> bool {
        self.inner.lock().has_backlog()
    }

    /// Snapshot of the diagnostic counters.
    pub fn stats(&self) -> QueueStats {
        self.inner.lock().stats.clone()
    }
}

impl TaskQueue {
    /// Entry point for every submission: counts it, applies head-invalidate
    /// dedup, then either fast-path dispatches or enqueues and pumps.
    fn submit(&self, entry: Entry) {
        let mut st = self.inner.lock();
        st.stats.submitted[entry.priority.index()] += 1;

        if entry.priority == Priority::HeadInvalidate && st.has_queued_head_invalidate() {
            st.stats.duplicates_dropped += 1;
            if let Some(g) = &entry.guard {
                g.defuse();
            }
            let ev = Event::new(EventKind::TaskDropped)
                .with_task_id(entry.id)
                .with_reason(QueueError::DuplicateHeadInvalidate.as_message());
            drop(st);
            self.inner.bus.publish(ev);
            return;
        }

        if !st.is_delayed() && !st.has_backlog() {
            self.dispatch_locked(&mut st, entry);
        } else {
            let (id, priority) = (entry.id, entry.priority);
            let depth = st.enqueue(entry);
            let ev = Event::new(EventKind::TaskQueued)
                .with_task(id, priority)
                .with_depth(depth);
            // The enqueue itself may unblock work (immediate lane, idle queue).
            self.drain_locked(&mut st);
            drop(st);
            self.inner.bus.publish(ev);
        }
    }

    /// The drain algorithm: record forward progress, then, unless a job is
    /// already in flight, pick the next runnable entry and dispatch it.
    fn drain_locked(&self, st: &mut QueueState) {
        st.last_task_finished_at = Instant::now();
        if st.inflight > 0 {
            return;
        }
        if let Some(entry) = st.pop_next() {
            self.dispatch_locked(st, entry);
        }
    }

    /// Builds the wrapper job for an entry and hands it to the executor.
    ///
    /// The single-flight claim and the head-invalidate flag flip happen
    /// here, under the state lock, before the job reaches the executor:
    /// a caller checking `is_delayed()` right after submitting a
    /// head-invalidate sees the gate closed, and an entry that already lost
    /// its timeout race is skipped in favor of the next runnable one (and
    /// never sets the flag).
    fn dispatch_locked(&self, st: &mut QueueState, entry: Entry) {
        let mut candidate = Some(entry);
        let entry = loop {
            let Some(next) = candidate.take() else { return };
            match self.claim_for_dispatch(next) {
                Some(e) => break e,
                None => candidate = st.pop_next(),
            }
        };

        if entry.kind == TaskKind::HeadInvalidate {
            st.waiting_for_head_reset = true;
        }

        st.inflight += 1;
        st.current_task = Some((entry.id, entry.priority));

        let queue = self.clone();
        let Entry {
            id,
            priority,
            kind,
            submitted_at,
            work,
            ..
        } = entry;

        let job = async move {
            let queue_delay = submitted_at.elapsed();
            queue.inner.bus.publish(
                Event::new(EventKind::TaskStarted)
                    .with_task(id, priority)
                    .with_queue_delay(queue_delay),
            );

            let run_started = Instant::now();
            work.await;
            let execution = run_started.elapsed();

            queue.complete(id, priority, kind, queue_delay, execution);
        }
        .boxed();

        self.inner.executor.submit(job);
    }

    /// Resolves the single-flight race for an entry about to dispatch.
    /// Returns the entry if its work may run; a loser publishes the race
    /// outcome and is discarded without reaching the executor.
    fn claim_for_dispatch(&self, entry: Entry) -> Option<Entry> {
        if let Some(g) = &entry.guard {
            if !g.claim() {
                self.inner.bus.publish(
                    Event::new(EventKind::TaskPreempted)
                        .with_task(entry.id, entry.priority)
                        .with_reason(QueueError::TimeoutRaceLost { loser: "work" }.as_message()),
                );
                return None;
            }
            g.timer.cancel();
        }
        Some(entry)
    }

    /// Completion bookkeeping: post-hook by wrapper variant, the per-task
    /// metrics report, then the drain.
    fn complete(
        &self,
        id: TaskId,
        priority: Priority,
        kind: TaskKind,
        queue_delay: Duration,
        execution: Duration,
    ) {
        {
            let mut st = self.inner.lock();
            st.inflight = st.inflight.saturating_sub(1);
            if st.inflight == 0 {
                st.current_task = None;
            }
            st.last_task_finished_at = Instant::now();

            match kind {
                TaskKind::Plain => {}
                TaskKind::Init => st.initialized = true,
                TaskKind::HeadReset => {
                    st.waiting_for_head_reset = false;
                    if !st.is_delayed() {
                        Self::cancel_watchdog_locked(&mut st);
                    }
                }
                TaskKind::HeadInvalidate => self.start_watchdog_locked(&mut st),
            }
        }

        self.inner.bus.publish(
            Event::new(EventKind::TaskFinished)
                .with_task(id, priority)
                .with_queue_delay(queue_delay)
                .with_execution(execution),
        );

        let mut st = self.inner.lock();
        self.drain_locked(&mut st);
    }

    /// Spawns the timer side of a timeout-guarded submission.
    ///
    /// On expiry the timer claims the single flight; if it wins, the fallback
    /// goes straight to the executor, bypassing the lanes and the drain. If
    /// the work won first, the timer publishes the race outcome and exits.
    fn spawn_timeout_timer(
        &self,
        id: TaskId,
        priority: Priority,
        guard: TimeoutGuard,
        timeout_work: Job,
        timeout: Duration,
    ) {
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = guard.timer.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if guard.claim() {
                        queue.inner.bus.publish(
                            Event::new(EventKind::TaskTimedOut).with_task(id, priority),
                        );
                        queue.inner.executor.submit(timeout_work);
                    } else {
                        queue.inner.bus.publish(
                            Event::new(EventKind::TaskPreempted)
                                .with_task(id, priority)
                                .with_reason(
                                    QueueError::TimeoutRaceLost { loser: "timeout" }.as_message(),
                                ),
                        );
                    }
                }
            }
        });
    }

    /// Arms the watchdog unless one is already scheduled.
    fn start_watchdog_locked(&self, st: &mut QueueState) {
        if st.watchdog.is_none() {
            st.watchdog = Some(watchdog::start(self));
        }
    }

    /// Disarms the watchdog. Idempotent; cancel-after-fire is a no-op.
    fn cancel_watchdog_locked(st: &mut QueueState) {
        if let Some(token) = st.watchdog.take() {
            token.cancel();
        }
    }

    /// Watchdog tick interval, for the loop in [`watchdog`].
    pub(crate) fn starvation_check_period(&self) -> Duration {
        self.inner.cfg.starvation_check_period
    }

    /// One watchdog check. Returns false when the loop should stop.
    ///
    /// Cancellation is re-checked under the lock so a tick racing a
    /// `cancel_watchdog_locked` call observes the cancel and backs off.
    pub(crate) fn watchdog_tick(&self, token: &tokio_util::sync::CancellationToken) -> bool {
        let mut st = self.inner.lock();
        if token.is_cancelled() {
            return false;
        }

        if !st.is_delayed() && !st.has_backlog() {
            Self::cancel_watchdog_locked(&mut st);
            return false;
        }

        let stalled = st.last_task_finished_at.elapsed();
        if stalled < self.inner.cfg.starvation_timeout {
            return true;
        }

        // Force-unblock: a stuck or dropped head-reset must not wedge the
        // queue permanently.
        st.initialized = true;
        st.waiting_for_head_reset = false;
        Self::cancel_watchdog_locked(&mut st);
        st.stats.starvation_recoveries += 1;

        let ev = Event::new(EventKind::StarvationRecovered)
            .with_reason(QueueError::Starved { stalled }.as_message());
        self.drain_locked(&mut st);
        drop(st);
        self.inner.bus.publish(ev);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use tokio::sync::{broadcast, oneshot};

    use crate::exec::SerialExecutor;

    type RunLog = Arc<StdMutex<Vec<&'static str>>>;

    fn queue() -> TaskQueue {
        queue_with(QueueConfig::default())
    }

    fn queue_with(cfg: QueueConfig) -> TaskQueue {
        TaskQueue::new(cfg, SerialExecutor::spawn())
    }

    fn run_log() -> RunLog {
        Arc::new(StdMutex::new(Vec::new()))
    }

    fn record(log: &RunLog, label: &'static str) -> impl Future<Output = ()> + Send + 'static {
        let log = Arc::clone(log);
        async move {
            log.lock().unwrap().push(label);
        }
    }

    fn recorded(log: &RunLog) -> Vec<&'static str> {
        log.lock().unwrap().clone()
    }

    /// Lets the executor worker, timers-turned-ready, and listeners run
    /// without advancing the (possibly paused) clock.
    async fn settle() {
        for _ in 0..64 {
            tokio::task::yield_now().await;
        }
    }

    fn collect(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn count_kind(events: &[Event], kind: EventKind) -> usize {
        events.iter().filter(|e| e.kind == kind).count()
    }

    #[tokio::test]
    async fn test_fresh_queue_is_delayed_and_idle() {
        let q = queue();
        assert!(q.is_delayed());
        assert!(q.is_idle());
        assert!(!q.has_backlog());
        assert!(!q.is_making_request());
    }

    #[tokio::test]
    async fn test_fast_path_dispatches_without_queueing() {
        let q = queue();
        let log = run_log();

        q.initialize(TaskId(0), record(&log, "init"));
        settle().await;
        assert!(!q.is_delayed());
        assert!(q.is_idle());

        let mut rx = q.bus().subscribe();
        q.execute(TaskId(1), Priority::UserFacing, record(&log, "u"));
        // Handed straight to the executor inside the call; never queued.
        assert!(!q.has_backlog());

        settle().await;
        assert_eq!(recorded(&log), vec!["init", "u"]);
        let events = collect(&mut rx);
        assert_eq!(count_kind(&events, EventKind::TaskQueued), 0);
        assert_eq!(count_kind(&events, EventKind::TaskStarted), 1);
        assert_eq!(count_kind(&events, EventKind::TaskFinished), 1);
    }

    #[tokio::test]
    async fn test_priority_ordering_and_fifo_within_class() {
        let q = queue();
        let log = run_log();

        // All gated: the queue is uninitialized, hence delayed.
        q.execute(TaskId(1), Priority::Background, record(&log, "bg_a"));
        q.execute(TaskId(2), Priority::Background, record(&log, "bg_b"));
        q.execute(TaskId(3), Priority::UserFacing, record(&log, "user"));
        settle().await;
        assert!(recorded(&log).is_empty());
        assert!(q.has_backlog());

        q.initialize(TaskId(0), record(&log, "init"));
        settle().await;
        assert_eq!(recorded(&log), vec!["init", "user", "bg_a", "bg_b"]);
        assert!(q.is_idle());
    }

    #[tokio::test]
    async fn test_immediate_class_runs_while_delayed() {
        let q = queue();
        let log = run_log();

        q.execute(TaskId(1), Priority::Immediate, record(&log, "imm"));
        settle().await;
        assert_eq!(recorded(&log), vec!["imm"]);
        assert!(q.is_delayed());
    }

    #[tokio::test]
    async fn test_duplicate_head_invalidate_is_dropped() {
        let q = queue();
        let log = run_log();
        let mut rx = q.bus().subscribe();
        let (release, gate) = oneshot::channel::<()>();

        {
            let log = Arc::clone(&log);
            q.initialize(TaskId(0), async move {
                let _ = gate.await;
                log.lock().unwrap().push("init");
            });
        }
        settle().await;
        assert!(!q.is_idle());

        // Init is in flight, so both land in the immediate lane; the second
        // is a duplicate while the first is queued.
        q.execute(TaskId(1), Priority::HeadInvalidate, record(&log, "inv_a"));
        q.execute(TaskId(2), Priority::HeadInvalidate, record(&log, "inv_b"));
        settle().await;

        release.send(()).unwrap();
        settle().await;

        assert_eq!(recorded(&log), vec!["init", "inv_a"]);
        let stats = q.stats();
        assert_eq!(stats.duplicates_dropped, 1);
        assert_eq!(stats.submitted[Priority::HeadInvalidate.index()], 2);
        let events = collect(&mut rx);
        assert_eq!(count_kind(&events, EventKind::TaskDropped), 1);
    }

    #[tokio::test]
    async fn test_head_invalidate_then_reset_gates_user_work() {
        let q = queue();
        let log = run_log();
        let (release, gate) = oneshot::channel::<()>();

        // T0: initialize, held in flight; T1 submitted before it completes.
        {
            let log = Arc::clone(&log);
            q.initialize(TaskId(0), async move {
                let _ = gate.await;
                log.lock().unwrap().push("t0");
            });
        }
        q.execute(TaskId(1), Priority::Background, record(&log, "t1"));
        settle().await;
        assert!(recorded(&log).is_empty());

        release.send(()).unwrap();
        settle().await;
        assert_eq!(recorded(&log), vec!["t0", "t1"]);
        assert!(!q.is_delayed());

        // T2: head-invalidate flips the queue into its delayed state.
        q.execute(TaskId(2), Priority::HeadInvalidate, record(&log, "t2"));
        settle().await;
        assert!(q.is_delayed());
        assert!(q.is_making_request());

        // T3: user-facing work must wait out the delay.
        q.execute(TaskId(3), Priority::UserFacing, record(&log, "t3"));
        settle().await;
        assert_eq!(recorded(&log), vec!["t0", "t1", "t2"]);

        // T4: the paired head-reset releases the gate.
        q.execute(TaskId(4), Priority::HeadReset, record(&log, "t4"));
        settle().await;
        assert!(!q.is_delayed());
        assert!(!q.is_making_request());
        assert_eq!(recorded(&log), vec!["t0", "t1", "t2", "t4", "t3"]);
    }

    #[tokio::test]
    async fn test_gate_closes_inside_head_invalidate_submission() {
        let q = queue();
        let log = run_log();

        q.initialize(TaskId(0), record(&log, "init"));
        settle().await;
        assert!(!q.is_delayed());

        // No yield between these calls: the gate must already be closed
        // when `execute` returns, so the user-facing task cannot take the
        // fast path past it.
        q.execute(TaskId(1), Priority::HeadInvalidate, record(&log, "inv"));
        assert!(q.is_delayed());
        q.execute(TaskId(2), Priority::UserFacing, record(&log, "user"));
        assert!(q.has_backlog());

        settle().await;
        assert_eq!(recorded(&log), vec!["init", "inv"]);

        q.execute(TaskId(3), Priority::HeadReset, record(&log, "hr"));
        settle().await;
        assert!(!q.is_delayed());
        assert_eq!(recorded(&log), vec!["init", "inv", "hr", "user"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spent_head_invalidate_does_not_mask_a_new_one() {
        let q = queue();
        let log = run_log();
        let mut rx = q.bus().subscribe();
        let (release, gate) = oneshot::channel::<()>();

        {
            let log = Arc::clone(&log);
            q.initialize(TaskId(0), async move {
                let _ = gate.await;
                log.lock().unwrap().push("init");
            });
        }
        settle().await;

        // Queued behind the held initializer; its start deadline expires,
        // so the entry in the lane can no longer run.
        q.execute_with_timeout(
            TaskId(1),
            Priority::HeadInvalidate,
            record(&log, "inv_a"),
            record(&log, "fallback"),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        settle().await;

        // A fresh head-invalidate must not be treated as a duplicate of
        // the spent entry.
        q.execute(TaskId(2), Priority::HeadInvalidate, record(&log, "inv_b"));
        settle().await;
        assert_eq!(q.stats().duplicates_dropped, 0);

        release.send(()).unwrap();
        settle().await;
        assert_eq!(recorded(&log), vec!["init", "fallback", "inv_b"]);
        let events = collect(&mut rx);
        assert_eq!(count_kind(&events, EventKind::TaskDropped), 0);
        assert_eq!(count_kind(&events, EventKind::TaskTimedOut), 1);
    }

    #[tokio::test]
    async fn test_reset_discards_queued_work_and_complete_reset_reopens() {
        let q = queue();
        let log = run_log();
        let mut rx = q.bus().subscribe();
        let (release, gate) = oneshot::channel::<()>();

        q.initialize(TaskId(0), record(&log, "init"));
        settle().await;

        // Hold the queue delayed with an in-flight head-invalidate.
        {
            let log = Arc::clone(&log);
            q.execute(TaskId(1), Priority::HeadInvalidate, async move {
                let _ = gate.await;
                log.lock().unwrap().push("inv");
            });
        }
        settle().await;
        assert!(q.is_delayed());

        q.execute(TaskId(2), Priority::Background, record(&log, "bg"));
        q.execute(TaskId(3), Priority::UserFacing, record(&log, "user"));
        settle().await;
        assert!(q.has_backlog());

        q.reset();
        assert!(!q.has_backlog());
        assert!(q.is_delayed());
        assert_eq!(q.stats().discarded, 2);

        // The in-flight task was not discarded; it still completes.
        release.send(()).unwrap();
        settle().await;
        assert_eq!(recorded(&log), vec!["init", "inv"]);
        assert!(q.is_delayed());

        q.complete_reset();
        settle().await;
        assert!(!q.is_delayed());
        assert!(q.is_idle());
        // Discarded work never runs.
        assert_eq!(recorded(&log), vec!["init", "inv"]);

        let events = collect(&mut rx);
        let reset_ev = events
            .iter()
            .find(|e| e.kind == EventKind::QueueReset)
            .unwrap();
        assert_eq!(reset_ev.depth, Some(2));
        assert_eq!(count_kind(&events, EventKind::ResetCompleted), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starvation_recovery_fires_exactly_once() {
        let cfg = QueueConfig {
            starvation_check_period: Duration::from_millis(5),
            starvation_timeout: Duration::from_millis(20),
            ..QueueConfig::default()
        };
        let q = queue_with(cfg);
        let log = run_log();

        q.initialize(TaskId(0), record(&log, "init"));
        settle().await;
        let mut rx = q.bus().subscribe();

        // Head-invalidate whose paired reset never arrives.
        q.execute(TaskId(1), Priority::HeadInvalidate, record(&log, "inv"));
        settle().await;
        assert!(q.is_delayed());

        q.execute(TaskId(2), Priority::UserFacing, record(&log, "after"));
        settle().await;
        assert_eq!(recorded(&log), vec!["init", "inv"]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        settle().await;

        // Force-unblocked: the gated task ran and the queue reports healthy.
        assert!(!q.is_delayed());
        assert_eq!(recorded(&log), vec!["init", "inv", "after"]);
        assert_eq!(q.stats().starvation_recoveries, 1);
        let events = collect(&mut rx);
        assert_eq!(count_kind(&events, EventKind::StarvationRecovered), 1);

        // The episode is over; the watchdog does not fire again.
        tokio::time::sleep(Duration::from_millis(100)).await;
        settle().await;
        assert_eq!(q.stats().starvation_recoveries, 1);
        let events = collect(&mut rx);
        assert_eq!(count_kind(&events, EventKind::StarvationRecovered), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_without_completion_starves_and_recovers() {
        let cfg = QueueConfig {
            starvation_check_period: Duration::from_millis(5),
            starvation_timeout: Duration::from_millis(20),
            ..QueueConfig::default()
        };
        let q = queue_with(cfg);
        let log = run_log();

        q.reset();
        q.execute(TaskId(1), Priority::UserFacing, record(&log, "user"));
        settle().await;
        assert!(recorded(&log).is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        settle().await;
        assert!(!q.is_delayed());
        assert_eq!(recorded(&log), vec!["user"]);
        assert_eq!(q.stats().starvation_recoveries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fallback_runs_when_work_never_starts() {
        let q = queue();
        let log = run_log();
        let mut rx = q.bus().subscribe();

        // Uninitialized queue: the user-facing work sits gated past its
        // start deadline.
        q.execute_with_timeout(
            TaskId(1),
            Priority::UserFacing,
            record(&log, "work"),
            record(&log, "fallback"),
            Duration::from_millis(50),
        );
        settle().await;
        assert!(recorded(&log).is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        settle().await;
        assert_eq!(recorded(&log), vec!["fallback"]);

        // When the gated entry finally dispatches, it is a no-op.
        q.initialize(TaskId(0), record(&log, "init"));
        settle().await;
        assert_eq!(recorded(&log), vec!["fallback", "init"]);
        assert!(q.is_idle());

        let events = collect(&mut rx);
        assert_eq!(count_kind(&events, EventKind::TaskTimedOut), 1);
        assert_eq!(count_kind(&events, EventKind::TaskPreempted), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_winning_timeout_race_silences_fallback() {
        let q = queue();
        let log = run_log();

        q.initialize(TaskId(0), record(&log, "init"));
        settle().await;

        let mut rx = q.bus().subscribe();
        q.execute_with_timeout(
            TaskId(1),
            Priority::UserFacing,
            record(&log, "work"),
            record(&log, "fallback"),
            Duration::from_millis(50),
        );
        settle().await;
        assert_eq!(recorded(&log), vec!["init", "work"]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        settle().await;
        assert_eq!(recorded(&log), vec!["init", "work"]);
        let events = collect(&mut rx);
        assert_eq!(count_kind(&events, EventKind::TaskTimedOut), 0);
    }

    #[tokio::test]
    async fn test_reinitialize_warns_but_still_runs() {
        let q = queue();
        let log = run_log();

        q.initialize(TaskId(0), record(&log, "first"));
        settle().await;

        let mut rx = q.bus().subscribe();
        q.initialize(TaskId(0), record(&log, "second"));
        settle().await;

        assert_eq!(recorded(&log), vec!["first", "second"]);
        let events = collect(&mut rx);
        assert_eq!(count_kind(&events, EventKind::ReinitializeWarned), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_event_reports_queue_delay_and_execution() {
        let q = queue();
        let log = run_log();

        // Queued while uninitialized; the clock advances before dispatch.
        q.execute(TaskId(1), Priority::UserFacing, async {
            tokio::time::sleep(Duration::from_millis(10)).await;
        });
        settle().await;
        tokio::time::advance(Duration::from_millis(30)).await;

        let mut rx = q.bus().subscribe();
        q.initialize(TaskId(0), record(&log, "init"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        settle().await;

        let events = collect(&mut rx);
        let finished: Vec<&Event> = events
            .iter()
            .filter(|e| e.kind == EventKind::TaskFinished && e.task_id == Some(TaskId(1)))
            .collect();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].priority, Some(Priority::UserFacing));
        assert_eq!(finished[0].queue_delay_ms, Some(30));
        assert_eq!(finished[0].execution_ms, Some(10));
    }

    #[tokio::test]
    async fn test_stats_track_submissions_per_priority() {
        let q = queue();
        let log = run_log();

        q.initialize(TaskId(0), record(&log, "init"));
        q.execute(TaskId(1), Priority::UserFacing, record(&log, "a"));
        q.execute(TaskId(2), Priority::Background, record(&log, "b"));
        q.execute(TaskId(3), Priority::Background, record(&log, "c"));
        settle().await;

        let stats = q.stats();
        assert_eq!(stats.submitted[Priority::Immediate.index()], 1);
        assert_eq!(stats.submitted[Priority::UserFacing.index()], 1);
        assert_eq!(stats.submitted[Priority::Background.index()], 2);
        assert_eq!(stats.max_background_depth, 2);
    }
}
