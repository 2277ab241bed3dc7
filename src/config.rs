//! Session configuration.

use std::time::Duration;

/// Timing and rollback behavior for a field session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Debounce delay between the last local edit and the commit attempt.
    pub delay: Duration,
    /// Quiet period after a successful commit before `Saved` decays back
    /// to `Idle`.
    pub saved_decay: Duration,
    /// Roll the displayed value back to the committed value when a commit
    /// fails. Validation failures roll back regardless.
    pub optimistic: bool,
    /// Deadline for a single commit attempt. `None` means a hung commit
    /// leaves the session in `Saving` until the handler resolves.
    pub commit_timeout: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            saved_decay: Duration::from_secs(2),
            optimistic: true,
            commit_timeout: None,
        }
    }
}
