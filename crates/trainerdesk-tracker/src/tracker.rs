//! The task tracker: submission, polling, cancellation and resume.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trainerdesk_client::UploadBatch;

use crate::api::TaskApi;
use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::monitor::{PollMonitor, PollOutcome, TransportFailure, Verdict};
use crate::snapshot::{NoSnapshots, Snapshot, SnapshotStore};
use crate::status::TaskStatus;
use crate::task::{TaskId, TrackedTask, TrackerPhase};

/// Lower bound applied to the configured poll interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Result of a successful cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    /// The revoked task.
    pub task_id: TaskId,
    /// Server message, if any.
    pub message: Option<String>,
}

/// Follows one background task at a time.
///
/// After [`submit`](Self::submit) (or [`track`](Self::track) /
/// [`resume`](Self::resume)) a polling task queries the status endpoint on a
/// fixed interval until a terminal status is reached, the tracker gives up,
/// or the task is cancelled. Once terminal, polling never resumes for that
/// task; a new task needs a new submission.
///
/// The latest status is always available through
/// [`current_status`](Self::current_status) and can be watched with
/// [`subscribe`](Self::subscribe). Dropping the tracker stops polling.
pub struct TaskTracker<A: TaskApi + 'static> {
    api: Arc<A>,
    config: TrackerConfig,
    shared: Arc<Shared>,
}

/// State shared with the polling task.
struct Shared {
    state: Mutex<State>,
    status_tx: watch::Sender<Option<TaskStatus>>,
    store: Arc<dyn SnapshotStore>,
}

struct State {
    phase: TrackerPhase,
    task: Option<TrackedTask>,
    monitor: Option<PollMonitor>,
    stop: Option<CancellationToken>,
    /// Bumped for every new task and on reset; pollers carrying an older
    /// generation may not touch the state.
    generation: u64,
}

/// Whether the poll loop should keep going.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

impl<A: TaskApi + 'static> TaskTracker<A> {
    /// Create a tracker that keeps no snapshots.
    pub fn new(api: Arc<A>, config: TrackerConfig) -> Self {
        Self::with_store(api, config, Arc::new(NoSnapshots))
    }

    /// Create a tracker persisting snapshots to `store`.
    pub fn with_store(api: Arc<A>, config: TrackerConfig, store: Arc<dyn SnapshotStore>) -> Self {
        let (status_tx, _) = watch::channel(None);
        Self {
            api,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    phase: TrackerPhase::Idle,
                    task: None,
                    monitor: None,
                    stop: None,
                    generation: 0,
                }),
                status_tx,
                store,
            }),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Submit a batch and start polling it.
    ///
    /// Fails with [`Error::TaskActive`] while another task is being submitted
    /// or tracked, and with [`Error::Submission`] when the server rejects the
    /// batch or answers without a usable task id. No polling starts on failure.
    pub async fn submit(&self, batch: UploadBatch) -> Result<TaskId> {
        if batch.is_empty() {
            return Err(Error::Submission("no files to upload".to_string()));
        }

        let generation = {
            let mut state = self.shared.state.lock();
            if !state.phase.accepts_new_task() {
                return Err(Error::TaskActive(active_label(&state)));
            }
            state.generation += 1;
            state.phase = TrackerPhase::Submitting;
            state.task = None;
            state.monitor = None;
            self.shared.publish(None);
            state.generation
        };

        info!(files = batch.len(), bytes = batch.total_bytes(), "submitting upload batch");
        let reply = self.api.submit(&batch).await;

        let task_id = match reply {
            Ok(resp) => match resp.task_id.as_deref().map(TaskId::parse) {
                Some(Ok(id)) => Ok(id),
                Some(Err(e)) => Err(Error::Submission(format!("server returned {e}"))),
                None => Err(Error::Submission(
                    "server response did not include a task id".to_string(),
                )),
            },
            Err(e) => Err(Error::Submission(e.to_string())),
        };

        let task_id = match task_id {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "batch submission failed");
                let mut state = self.shared.state.lock();
                if state.generation == generation {
                    state.phase = TrackerPhase::Idle;
                    self.shared.publish(None);
                }
                return Err(e);
            }
        };

        {
            let state = self.shared.state.lock();
            if state.generation != generation {
                return Err(Error::Submission(format!(
                    "tracker was reset while task {task_id} was being submitted"
                )));
            }
        }

        info!(task_id = %task_id, "batch accepted");
        self.begin_tracking(generation, task_id.clone(), TaskStatus::pending(), true);
        Ok(task_id)
    }

    /// Follow a task that was submitted elsewhere.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn track(&self, task_id: TaskId) -> Result<()> {
        let generation = self.claim()?;
        info!(task_id = %task_id, "tracking existing task");
        self.begin_tracking(generation, task_id, TaskStatus::pending(), true);
        Ok(())
    }

    /// Resume the task recorded in the snapshot store, if any.
    ///
    /// The stored status is shown until the first poll replaces it, and the
    /// snapshot is left as is until the status changes. Stale, unreadable or
    /// already-terminal snapshots are cleared and ignored.
    /// Must be called from within a Tokio runtime.
    pub fn resume(&self) -> Result<Option<TaskId>> {
        {
            let state = self.shared.state.lock();
            if !state.phase.accepts_new_task() {
                return Err(Error::TaskActive(active_label(&state)));
            }
        }

        let snapshot = match self.shared.store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = %e, "discarding unreadable task snapshot");
                self.shared.clear_snapshot();
                return Ok(None);
            }
        };

        let too_old = chrono::Duration::from_std(self.config.snapshot_max_age)
            .is_ok_and(|max_age| snapshot.age(Utc::now()) > max_age);
        if too_old {
            info!(task_id = %snapshot.task_id, saved_at = %snapshot.saved_at, "discarding stale task snapshot");
            self.shared.clear_snapshot();
            return Ok(None);
        }

        if snapshot.status.as_ref().is_some_and(TaskStatus::is_terminal) {
            debug!(task_id = %snapshot.task_id, "snapshot already terminal");
            self.shared.clear_snapshot();
            return Ok(None);
        }

        let generation = self.claim()?;
        let seed = snapshot.status.unwrap_or_else(TaskStatus::pending);
        info!(task_id = %snapshot.task_id, state = seed.label(), "resuming task from snapshot");
        self.begin_tracking(generation, snapshot.task_id.clone(), seed, false);
        Ok(Some(snapshot.task_id))
    }

    /// Cancel the tracked task.
    ///
    /// On success the local status becomes `REVOKED` immediately and polling
    /// stops, whatever the server reports later. Work the server already did
    /// is not rolled back. When the server refuses, polling continues and
    /// the status is left untouched.
    pub async fn cancel(&self, task_id: &TaskId) -> Result<CancelOutcome> {
        let generation = {
            let state = self.shared.state.lock();
            self.check_cancellable(&state, task_id)?;
            state.generation
        };

        info!(task_id = %task_id, "requesting cancellation");
        let reply = self.api.cancel(task_id.as_str()).await?;
        if !reply.success {
            let reason = reply
                .message
                .unwrap_or_else(|| "server refused to cancel the task".to_string());
            warn!(task_id = %task_id, reason = %reason, "cancellation rejected");
            return Err(Error::CancelRejected(reason));
        }

        let mut state = self.shared.state.lock();
        if state.generation != generation {
            return Err(Error::NoActiveTask);
        }
        self.check_cancellable(&state, task_id)?;

        let status = TaskStatus::Revoked {
            message: reply.message.clone(),
        };
        self.shared.finalize(&mut state, status);
        Ok(CancelOutcome {
            task_id: task_id.clone(),
            message: reply.message,
        })
    }

    /// Latest known status. `None` before the first submission or after a
    /// reset.
    pub fn current_status(&self) -> Option<TaskStatus> {
        self.shared.status_tx.borrow().clone()
    }

    /// Watch status changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<TaskStatus>> {
        self.shared.status_tx.subscribe()
    }

    /// Wait until the current task reaches a terminal status.
    ///
    /// Returns `None` if there is no task, or if it is dropped by a reset or
    /// a failed submission.
    pub async fn wait(&self) -> Option<TaskStatus> {
        let mut rx = self.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(status) = current
                && status.is_terminal()
            {
                return Some(status);
            }
            if self.phase() == TrackerPhase::Idle {
                return None;
            }
            if rx.changed().await.is_err() {
                return self.current_status();
            }
        }
    }

    pub fn phase(&self) -> TrackerPhase {
        self.shared.state.lock().phase
    }

    /// The task being (or last) tracked.
    pub fn task(&self) -> Option<TrackedTask> {
        self.shared.state.lock().task.clone()
    }

    /// Number of polls started for the current task.
    pub fn poll_count(&self) -> u64 {
        self.shared
            .state
            .lock()
            .monitor
            .as_ref()
            .map_or(0, PollMonitor::polls)
    }

    /// Stop polling, forget the task and clear the snapshot.
    ///
    /// The server-side task is not cancelled.
    pub fn reset(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            state.generation += 1;
            if let Some(stop) = state.stop.take() {
                stop.cancel();
            }
            state.phase = TrackerPhase::Idle;
            state.task = None;
            state.monitor = None;
            self.shared.publish(None);
        }
        self.shared.store.clear()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Reserve the tracker for a new task.
    fn claim(&self) -> Result<u64> {
        let mut state = self.shared.state.lock();
        if !state.phase.accepts_new_task() {
            return Err(Error::TaskActive(active_label(&state)));
        }
        state.generation += 1;
        Ok(state.generation)
    }

    fn check_cancellable(&self, state: &State, task_id: &TaskId) -> Result<()> {
        let Some(task) = state.task.as_ref() else {
            return Err(Error::NoActiveTask);
        };
        if task.id != *task_id {
            return Err(Error::TaskMismatch {
                requested: task_id.to_string(),
                tracked: task.id.to_string(),
            });
        }
        match state.phase {
            TrackerPhase::Tracking => Ok(()),
            TrackerPhase::Finished => Err(Error::AlreadyFinished {
                task_id: task_id.to_string(),
                state: self
                    .current_status()
                    .map_or("UNKNOWN", |s| s.label())
                    .to_string(),
            }),
            TrackerPhase::Idle | TrackerPhase::Submitting => Err(Error::NoActiveTask),
        }
    }

    fn begin_tracking(
        &self,
        generation: u64,
        task_id: TaskId,
        seed: TaskStatus,
        save_seed: bool,
    ) {
        let stop = CancellationToken::new();
        {
            let mut state = self.shared.state.lock();
            if state.generation != generation {
                return;
            }
            state.phase = TrackerPhase::Tracking;
            state.task = Some(TrackedTask {
                id: task_id.clone(),
                submitted_at: Utc::now(),
            });
            state.monitor = Some(PollMonitor::new(&self.config));
            state.stop = Some(stop.clone());
            if save_seed {
                self.shared.save_snapshot(&task_id, Some(&seed));
            }
            self.shared.publish(Some(seed));
        }

        tokio::spawn(poll_loop(
            Arc::clone(&self.api),
            Arc::clone(&self.shared),
            task_id,
            generation,
            stop,
            self.config.poll_interval,
        ));
    }
}

impl<A: TaskApi + 'static> Drop for TaskTracker<A> {
    fn drop(&mut self) {
        if let Some(stop) = self.shared.state.lock().stop.take() {
            stop.cancel();
        }
    }
}

fn active_label(state: &State) -> String {
    match (&state.task, state.phase) {
        (Some(task), _) => task.id.to_string(),
        (None, TrackerPhase::Submitting) => "submission in progress".to_string(),
        (None, _) => "unknown".to_string(),
    }
}

impl Shared {
    fn publish(&self, status: Option<TaskStatus>) {
        self.status_tx.send_replace(status);
    }

    fn save_snapshot(&self, task_id: &TaskId, status: Option<&TaskStatus>) {
        let snapshot = Snapshot::new(task_id.clone(), status.cloned());
        if let Err(e) = self.store.save(&snapshot) {
            warn!(task_id = %task_id, error = %e, "failed to save task snapshot");
        }
    }

    fn clear_snapshot(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear task snapshot");
        }
    }

    /// Move to the terminal state. Caller holds the lock.
    fn finalize(&self, state: &mut State, status: TaskStatus) {
        state.phase = TrackerPhase::Finished;
        if let Some(monitor) = state.monitor.as_mut() {
            monitor.finish();
        }
        if let Some(stop) = state.stop.take() {
            stop.cancel();
        }
        if let Some(task) = &state.task {
            info!(
                task_id = %task.id,
                state = status.label(),
                message = status.message().unwrap_or_default(),
                "task finished"
            );
        }
        self.clear_snapshot();
        self.publish(Some(status));
    }

    /// Gate a poll: checks ownership and the wall-clock ceiling.
    fn begin_poll(&self, generation: u64) -> Flow {
        let mut state = self.state.lock();
        if state.generation != generation || state.phase != TrackerPhase::Tracking {
            return Flow::Stop;
        }
        let Some(monitor) = state.monitor.as_mut() else {
            return Flow::Stop;
        };
        match monitor.begin_poll(Instant::now()) {
            Some(timeout) => {
                warn!(state = timeout.label(), "giving up waiting for task");
                self.finalize(&mut state, timeout);
                Flow::Stop
            }
            None => Flow::Continue,
        }
    }

    /// Apply a poll outcome.
    fn record(&self, generation: u64, task_id: &TaskId, outcome: PollOutcome) -> Flow {
        let mut state = self.state.lock();
        if state.generation != generation || state.phase != TrackerPhase::Tracking {
            return Flow::Stop;
        }
        let Some(monitor) = state.monitor.as_mut() else {
            return Flow::Stop;
        };

        match monitor.observe(outcome) {
            Verdict::Continue(Some(status)) => {
                let changed = self.status_tx.borrow().as_ref() != Some(&status);
                if changed {
                    debug!(task_id = %task_id, status = %status, "task status changed");
                    self.save_snapshot(task_id, Some(&status));
                    self.publish(Some(status));
                }
                Flow::Continue
            }
            Verdict::Continue(None) => Flow::Continue,
            Verdict::Finish(status) => {
                self.finalize(&mut state, status);
                Flow::Stop
            }
            Verdict::Stale => Flow::Stop,
        }
    }
}

/// Poll the status endpoint until told to stop.
async fn poll_loop<A: TaskApi + 'static>(
    api: Arc<A>,
    shared: Arc<Shared>,
    task_id: TaskId,
    generation: u64,
    stop: CancellationToken,
    interval: Duration,
) {
    let _guard = PollGuard {
        shared: Arc::clone(&shared),
        generation,
    };
    let mut ticker = tokio::time::interval(interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if shared.begin_poll(generation) == Flow::Stop {
            break;
        }

        let reply = tokio::select! {
            _ = stop.cancelled() => break,
            reply = api.status(task_id.as_str()) => reply,
        };

        let outcome = match reply {
            Ok(resp) => PollOutcome::Status(TaskStatus::from_response(&resp)),
            Err(e) => {
                let failure = TransportFailure::from(&e);
                debug!(task_id = %task_id, kind = ?failure.kind, error = %e, "status poll failed");
                PollOutcome::Failed(failure)
            }
        };

        if shared.record(generation, &task_id, outcome) == Flow::Stop {
            break;
        }
    }

    debug!(task_id = %task_id, "poller stopped");
}

/// Finalizes the task as unknown when the poller unwinds.
struct PollGuard {
    shared: Arc<Shared>,
    generation: u64,
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        let mut state = self.shared.state.lock();
        if state.generation != self.generation || state.phase != TrackerPhase::Tracking {
            return;
        }
        error!("status poller panicked");
        self.shared.finalize(
            &mut state,
            TaskStatus::Unknown {
                message: "Status tracking stopped unexpectedly. The task may still be running; \
                          verify the results before retrying."
                    .to_string(),
            },
        );
    }
}
