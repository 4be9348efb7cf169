//! Background file deletion.

use std::path::PathBuf;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Result of a delete request. Never an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Empty logical path; nothing was attempted.
    Skipped,
    /// The file was removed.
    Deleted {
        /// Physical path of the removed file.
        path: PathBuf,
    },
    /// No file exists at the resolved location.
    NotFound {
        /// Physical path that was checked.
        path: PathBuf,
    },
    /// Deletion failed and was suppressed. Carries the logical path, since a
    /// rejected path never resolves to a physical one.
    Failed {
        /// The logical path the caller asked to delete.
        logical_path: String,
        /// Why the deletion failed.
        reason: String,
    },
}

impl DeleteOutcome {
    /// Returns true if a file was actually removed.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted { .. })
    }

    /// Writes the outcome to the log.
    pub fn log(&self) {
        match self {
            Self::Skipped => {}
            Self::Deleted { path } => info!(path = %path.display(), "File deleted"),
            Self::NotFound { path } => warn!(path = %path.display(), "File not found"),
            Self::Failed {
                logical_path,
                reason,
            } => {
                error!(path = %logical_path, error = %reason, "Failed to delete file");
            }
        }
    }
}

/// Handle to a dispatched delete.
///
/// Dropping the handle detaches the task; it still runs to completion.
#[derive(Debug)]
#[must_use = "call `wait` to observe the outcome or `detach` to run it in the background"]
pub struct DeleteTask {
    logical_path: String,
    state: TaskState,
}

#[derive(Debug)]
enum TaskState {
    Ready(DeleteOutcome),
    Running(JoinHandle<DeleteOutcome>),
}

impl DeleteTask {
    pub(super) fn ready(logical_path: impl Into<String>, outcome: DeleteOutcome) -> Self {
        Self {
            logical_path: logical_path.into(),
            state: TaskState::Ready(outcome),
        }
    }

    pub(super) fn running(logical_path: impl Into<String>, handle: JoinHandle<DeleteOutcome>) -> Self {
        Self {
            logical_path: logical_path.into(),
            state: TaskState::Running(handle),
        }
    }

    /// The logical path this task is deleting.
    #[must_use]
    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    /// Waits for the delete to finish.
    pub async fn wait(self) -> DeleteOutcome {
        match self.state {
            TaskState::Ready(outcome) => outcome,
            TaskState::Running(handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let outcome = DeleteOutcome::Failed {
                        logical_path: self.logical_path,
                        reason: e.to_string(),
                    };
                    outcome.log();
                    outcome
                }
            },
        }
    }

    /// Lets the delete finish in the background.
    pub fn detach(self) {}
}
