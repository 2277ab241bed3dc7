//! Core data model.
//!
//! A field session binds one editable value to the synchronization
//! machinery. It has identity (which cell it is), a committed value, a
//! displayed value, and a lifecycle status.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::error::{CommitError, Error};

// ---------------------------------------------------------------------------
// Field Id
// ---------------------------------------------------------------------------

/// Newtype for field identifiers.
///
/// Callers choose the format; a dashboard cell is typically
/// "record:column" (e.g. `customer/42:email`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldId(pub String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for FieldId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FieldId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a field session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Displayed value matches the committed value; nothing scheduled.
    Idle,
    /// Local edit recorded, debounce timer running.
    Pending,
    /// A commit cycle is active.
    Saving,
    /// Last commit succeeded; decays back to `Idle` after a quiet period.
    Saved,
    /// Last commit or validation failed; retry is available.
    Error,
}

impl Status {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (Idle, Pending)
                | (Pending, Saving)
                | (Pending, Idle)    // reset
                | (Saving, Saved)
                | (Saving, Error)
                | (Saving, Idle)     // reset mid-flight
                | (Saved, Pending)
                | (Saved, Idle)      // auto-decay, reset, refresh
                | (Error, Pending)
                | (Error, Saving)    // retry
                | (Error, Idle) // reset
        )
    }

    /// No local edit pending and no commit outstanding.
    pub fn is_settled(self) -> bool {
        matches!(self, Status::Idle | Status::Saved)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::Pending => "pending",
            Status::Saving => "saving",
            Status::Saved => "saved",
            Status::Error => "error",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of a field session, published to renderers.
#[derive(Debug, Clone)]
pub struct FieldSnapshot<V> {
    /// The value to display.
    pub value: V,
    /// Lifecycle status.
    pub status: Status,
    /// The most recent failure. Kept across an edit that leaves `Error`;
    /// cleared by the next successful commit or an explicit reset.
    pub error: Option<Arc<Error>>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Future returned by a commit handler.
pub type CommitFuture = Pin<Box<dyn Future<Output = std::result::Result<(), CommitError>> + Send>>;

/// Caller-supplied commit handler. Receives the value to persist.
pub type CommitHandler<V> = Arc<dyn Fn(V) -> CommitFuture + Send + Sync>;

/// Caller-supplied synchronous validator. `Some(reason)` rejects the
/// value before any commit is attempted.
pub type Validator<V> = Arc<dyn Fn(&V) -> Option<String> + Send + Sync>;

/// Hook invoked after each successful commit.
pub type SuccessHook = Arc<dyn Fn() + Send + Sync>;

/// Hook invoked after each failed validation or commit.
pub type ErrorHook = Arc<dyn Fn(&Error) + Send + Sync>;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for creating field sessions. The public API for binding a
/// value to the synchronization machinery.
pub struct SessionOptions<V> {
    pub(crate) initial: V,
    pub(crate) config: SyncConfig,
    pub(crate) commit: CommitHandler<V>,
    pub(crate) validate: Option<Validator<V>>,
    pub(crate) on_success: Option<SuccessHook>,
    pub(crate) on_error: Option<ErrorHook>,
}

impl<V> SessionOptions<V> {
    pub fn new<F, Fut>(initial: V, commit: F) -> Self
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), CommitError>> + Send + 'static,
    {
        Self {
            initial,
            config: SyncConfig::default(),
            commit: Arc::new(move |v: V| -> CommitFuture { Box::pin(commit(v)) }),
            validate: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Replace the whole timing configuration.
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    pub fn saved_decay(mut self, period: Duration) -> Self {
        self.config.saved_decay = period;
        self
    }

    pub fn optimistic(mut self, optimistic: bool) -> Self {
        self.config.optimistic = optimistic;
        self
    }

    pub fn commit_timeout(mut self, timeout: Duration) -> Self {
        self.config.commit_timeout = Some(timeout);
        self
    }

    pub fn validate(mut self, f: impl Fn(&V) -> Option<String> + Send + Sync + 'static) -> Self {
        self.validate = Some(Arc::new(f));
        self
    }

    pub fn on_success(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}
