//! Tracked execution of refresh tasks.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{LoadState, TrackedOutcome};
use crate::observable::{Publisher, Subscription};

/// Message published when a tracked task panics.
const PANIC_MESSAGE: &str = "refresh task panicked";

/// Publishes `Idle` if the task future is dropped before it settles.
///
/// Lives inside the spawned task, so an aborted task or a runtime shutdown
/// still leaves the state terminal.
struct TerminalGuard {
    state: Publisher<LoadState>,
    settled: bool,
}

impl TerminalGuard {
    fn settle(&mut self, outcome: &TrackedOutcome) {
        self.state.publish(outcome.terminal_state());
        self.settled = true;
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.state.publish(LoadState::Idle);
        }
    }
}

/// Runs refresh tasks and exposes their combined [`LoadState`].
///
/// Overlapping `run_tracked` calls are not serialized: each one publishes
/// `Loading` and then its own terminal state, so the last task to finish
/// decides what observers see.
pub struct LoadCoordinator {
    state: Publisher<LoadState>,
    runtime: Handle,
}

impl fmt::Debug for LoadCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCoordinator")
            .field("state", &self.state.latest())
            .finish_non_exhaustive()
    }
}

impl LoadCoordinator {
    /// Create an idle coordinator that spawns on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            state: Publisher::with_initial(LoadState::Idle),
            runtime,
        }
    }

    /// Run `task` in the background with load tracking.
    ///
    /// `Loading` is published before the task is spawned. When the task ends
    /// the state becomes `Idle` (success or cancellation) or
    /// `Error(message)` (failure). The error itself is not returned to the
    /// caller beyond its message in the handle's outcome.
    ///
    /// Dropping the returned handle does not cancel the task.
    pub fn run_tracked<F, E>(&self, task: F) -> LoadHandle
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.state.publish(LoadState::Loading);

        let cancellation = CancellationToken::new();
        let token = cancellation.clone();
        let mut guard = TerminalGuard {
            state: self.state.clone(),
            settled: false,
        };

        let task = self.runtime.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => TrackedOutcome::Cancelled,
                result = AssertUnwindSafe(task).catch_unwind() => match result {
                    Ok(Ok(())) => TrackedOutcome::Completed,
                    Ok(Err(e)) => TrackedOutcome::Failed(e.to_string()),
                    Err(_) => TrackedOutcome::Failed(PANIC_MESSAGE.to_string()),
                },
            };

            match &outcome {
                TrackedOutcome::Completed => debug!("Tracked task completed"),
                TrackedOutcome::Failed(message) => warn!(error = %message, "Tracked task failed"),
                TrackedOutcome::Cancelled => info!("Tracked task cancelled"),
            }

            guard.settle(&outcome);
            outcome
        });

        LoadHandle { task, cancellation }
    }

    /// Clear an error so it is not shown again.
    ///
    /// Returns true if an error was cleared. Does nothing, and publishes
    /// nothing, unless the current state is `Error`.
    pub fn dismiss_error(&self) -> bool {
        self.state.update(|current| {
            matches!(current, Some(LoadState::Error(_))).then_some(LoadState::Idle)
        })
    }

    /// Current load state.
    pub fn state(&self) -> LoadState {
        self.state.latest().unwrap_or_default()
    }

    /// Returns true while a tracked task is running.
    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// Observe load state changes, starting with the current state.
    pub fn subscribe(&self) -> Subscription<LoadState> {
        self.state.subscribe()
    }
}

/// Handle to a tracked task.
pub struct LoadHandle {
    task: JoinHandle<TrackedOutcome>,
    cancellation: CancellationToken,
}

impl fmt::Debug for LoadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadHandle")
            .field("finished", &self.task.is_finished())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

impl LoadHandle {
    /// Request cancellation. The state settles to `Idle`.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns true once the task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task and return how it ended.
    pub async fn wait(self) -> TrackedOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => TrackedOutcome::Cancelled,
            Err(_) => TrackedOutcome::Failed(PANIC_MESSAGE.to_string()),
        }
    }
}
