// ── Update orchestration ──
//
// Turns "start an update with mode X" into a dispatched transition, runs
// the external update operation as its own Tokio task, and guarantees
// exactly one terminal `StopUpdate` per run however the task ends.
//
// At most one cancellation token is live. Run ids are allocated under the
// same lock that installs the new token, so the slot always holds the
// newest run; the reducer ignores a `StartUpdate` older than one it has
// already seen, so concurrent starts converge on that same run.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::error::UpdateError;
use crate::model::{RunId, UpdateMode, UpdateOutcome};
use crate::store::{Store, lock};
use crate::updater::{ProgressReporter, UpdateRequest, Updater};

// ── RunPhase ─────────────────────────────────────────────────────

/// Lifecycle of the orchestrator's live run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Starting,
    Running,
    /// Cancellation requested; waiting for the operation to unwind.
    Stopping,
}

struct ActiveRun {
    run: RunId,
    cancel: CancellationToken,
    phase: RunPhase,
}

type ActiveSlot = Arc<Mutex<Option<ActiveRun>>>;

// ── UpdateOrchestrator ───────────────────────────────────────────

/// Drives update runs against the store.
///
/// Cheaply cloneable via `Arc<OrchestratorInner>`. Dropping the last
/// clone cancels the live run.
pub struct UpdateOrchestrator<U: Updater> {
    inner: Arc<OrchestratorInner<U>>,
}

impl<U: Updater> Clone for UpdateOrchestrator<U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct OrchestratorInner<U: Updater> {
    store: Store,
    updater: Arc<U>,
    active: ActiveSlot,
    next_run: AtomicU64,
}

impl<U: Updater> UpdateOrchestrator<U> {
    pub fn new(store: Store, updater: U) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                store,
                updater: Arc::new(updater),
                active: Arc::new(Mutex::new(None)),
                next_run: AtomicU64::new(0),
            }),
        }
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn updater(&self) -> &U {
        &self.inner.updater
    }

    /// Start a new run, cancelling any previous one.
    ///
    /// Not guarded: the command layer in [`MainView`](crate::MainView)
    /// decides whether starting is allowed. Must be called from within a
    /// Tokio runtime.
    pub fn start_update(&self, mode: UpdateMode) -> RunHandle {
        let inner = &self.inner;
        let cancel = CancellationToken::new();
        let (run, previous) = {
            let mut active = lock(&inner.active);
            let run = RunId(inner.next_run.fetch_add(1, Ordering::Relaxed) + 1);
            let previous = active.replace(ActiveRun {
                run,
                cancel: cancel.clone(),
                phase: RunPhase::Starting,
            });
            (run, previous)
        };

        // Dispatched before the previous token fires, so the cancelled run's
        // stop lands after this start.
        inner.store.dispatch(Action::StartUpdate { mode, run });

        if let Some(previous) = previous {
            previous.cancel.cancel();
            info!(previous = %previous.run, %run, "cancelled superseded update run");
        }

        let state = inner.store.state();
        let request = UpdateRequest {
            run,
            mode,
            servers: state.servers.clone(),
            username: state.username.clone(),
            password: SecretString::from(state.password.clone()),
            port: state.port,
            use_credentials: true,
            progress: ProgressReporter::new(inner.store.clone(), run),
        };
        info!(%run, %mode, servers = request.servers.len(), "starting update run");

        // Created outside the task so that a task dropped before its first
        // poll still reports its stop.
        let guard = RunGuard {
            store: inner.store.clone(),
            active: Arc::clone(&inner.active),
            run,
            finished: false,
        };
        let updater = Arc::clone(&inner.updater);
        let task_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            let result = updater.update(request, task_cancel.clone()).await;
            let outcome = classify(run, result, &task_cancel);
            guard.finish(outcome);
            outcome
        });

        if let Some(active) = lock(&inner.active).as_mut() {
            if active.run == run && active.phase == RunPhase::Starting {
                active.phase = RunPhase::Running;
            }
        }

        RunHandle { run, cancel, join }
    }

    /// Request cancellation of the live run. Returns `false` when idle.
    ///
    /// Never dispatches: the run's own unwind produces the `StopUpdate`.
    pub fn stop_update(&self) -> bool {
        let mut active = lock(&self.inner.active);
        let Some(active) = active.as_mut() else {
            debug!("stop requested with no live run");
            return false;
        };
        if !active.cancel.is_cancelled() {
            info!(run = %active.run, "cancelling update run");
            active.cancel.cancel();
        }
        active.phase = RunPhase::Stopping;
        true
    }

    pub fn phase(&self) -> RunPhase {
        lock(&self.inner.active)
            .as_ref()
            .map_or(RunPhase::Idle, |active| {
                if active.cancel.is_cancelled() {
                    RunPhase::Stopping
                } else {
                    active.phase
                }
            })
    }

    /// The run currently owning the cancellation token, if any.
    pub fn active_run(&self) -> Option<RunId> {
        lock(&self.inner.active).as_ref().map(|active| active.run)
    }
}

impl<U: Updater> Drop for OrchestratorInner<U> {
    fn drop(&mut self) {
        if let Some(active) = lock(&self.active).as_ref() {
            debug!(run = %active.run, "orchestrator dropped, cancelling live run");
            active.cancel.cancel();
        }
    }
}

impl<U: Updater> fmt::Debug for UpdateOrchestrator<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateOrchestrator")
            .field("phase", &self.phase())
            .field("active_run", &self.active_run())
            .finish_non_exhaustive()
    }
}

fn classify(
    run: RunId,
    result: Result<(), UpdateError>,
    cancel: &CancellationToken,
) -> UpdateOutcome {
    match result {
        Ok(()) => UpdateOutcome::Completed,
        Err(err) if err.is_cancelled() || cancel.is_cancelled() => {
            info!(%run, error = %err, "update run cancelled");
            UpdateOutcome::Cancelled
        }
        Err(err) => {
            warn!(%run, error = %err, "update run failed");
            UpdateOutcome::Failed
        }
    }
}

// ── RunGuard ─────────────────────────────────────────────────────

/// Dispatches the run's `StopUpdate` exactly once: explicitly through
/// [`finish`](Self::finish), or as a failure when dropped on panic or abort.
struct RunGuard {
    store: Store,
    active: ActiveSlot,
    run: RunId,
    finished: bool,
}

impl RunGuard {
    fn finish(mut self, outcome: UpdateOutcome) {
        self.finished = true;
        self.release(outcome);
    }

    fn release(&self, outcome: UpdateOutcome) {
        {
            let mut active = lock(&self.active);
            if active.as_ref().is_some_and(|a| a.run == self.run) {
                *active = None;
            }
        }
        info!(run = %self.run, %outcome, "update run finished");
        self.store.dispatch(Action::stop(self.run, outcome));
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(run = %self.run, "update run ended without completing");
            self.release(UpdateOutcome::Failed);
        }
    }
}

// ── RunHandle ────────────────────────────────────────────────────

/// Handle to a spawned run.
#[derive(Debug)]
pub struct RunHandle {
    run: RunId,
    cancel: CancellationToken,
    join: JoinHandle<UpdateOutcome>,
}

impl RunHandle {
    pub fn run(&self) -> RunId {
        self.run
    }

    /// Whether this run's cancellation has been requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Forcibly drop the run's task. The run still reports its stop.
    pub fn abort(&self) {
        self.join.abort();
    }

    /// Wait for the run to end.
    pub async fn outcome(self) -> UpdateOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(run = %self.run, error = %err, "update run did not complete");
                UpdateOutcome::Failed
            }
        }
    }
}
