//! Load state for background refreshes.
//!
//! [`LoadCoordinator`] runs refresh tasks and publishes a [`LoadState`] that
//! a front end can map to a spinner and an error banner. The data stream is
//! independent of this state: a failed refresh shows an error but leaves the
//! displayed plants alone.
//!
//! # State Machine
//!
//! ```text
//! Idle/Error --[run_tracked]--> Loading
//! Loading --[task Ok]--> Idle
//! Loading --[task Err(e)]--> Error(e.to_string())
//! Loading --[cancelled / aborted]--> Idle
//! Error --[dismiss_error]--> Idle
//! ```

mod coordinator;

pub use coordinator::{LoadCoordinator, LoadHandle};

use std::fmt;

/// Externally visible status of refresh work.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing running, nothing to report.
    #[default]
    Idle,
    /// A refresh is in progress.
    Loading,
    /// The last refresh failed with this message.
    Error(String),
}

impl LoadState {
    /// Returns true while a refresh is running (spinner visible).
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    /// The error banner text, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            LoadState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Idle => write!(f, "idle"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// How a tracked task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedOutcome {
    /// The task returned `Ok`.
    Completed,
    /// The task returned `Err` or panicked; only the message is kept.
    Failed(String),
    /// The task was cancelled before it finished.
    Cancelled,
}

impl TrackedOutcome {
    /// Returns true if the task completed successfully.
    pub fn is_completed(&self) -> bool {
        matches!(self, TrackedOutcome::Completed)
    }

    /// The terminal load state this outcome maps to.
    pub fn terminal_state(&self) -> LoadState {
        match self {
            TrackedOutcome::Completed | TrackedOutcome::Cancelled => LoadState::Idle,
            TrackedOutcome::Failed(message) => LoadState::Error(message.clone()),
        }
    }
}
