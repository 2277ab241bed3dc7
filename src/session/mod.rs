//! Field sessions: the public handle and the machinery behind it.
//!
//! A session is one instance of the synchronization engine bound to a
//! single editable value. The handle is the caller's side: edits,
//! retry/reset, upstream refresh, and snapshot reads. Everything else —
//! debounce, single-flight commits, coalescing, rollback — happens on
//! the session's driver task.

pub mod state;

mod driver;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::error::Error;
use crate::model::{FieldId, FieldSnapshot, SessionOptions, Status};
use driver::{Command, Driver};

/// Handle to a running field session.
///
/// Cheap to clone; the session tears down when the last handle is
/// dropped. All operations are fire-and-forget: they never block, never
/// error, and take effect on the session's driver task. Failures are
/// observed through [`snapshot`](Self::snapshot) or the `on_error` hook,
/// never thrown.
pub struct FieldHandle<V> {
    id: FieldId,
    cmd_tx: mpsc::UnboundedSender<Command<V>>,
    snapshot_rx: watch::Receiver<FieldSnapshot<V>>,
}

impl<V: Clone + PartialEq + Send + Sync + 'static> FieldHandle<V> {
    /// Spawn a session on the current tokio runtime.
    ///
    /// The session starts `Idle` with the builder's initial value as both
    /// the displayed and the committed value.
    pub fn spawn(id: FieldId, options: SessionOptions<V>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(FieldSnapshot {
            value: options.initial.clone(),
            status: Status::Idle,
            error: None,
        });
        let driver = Driver::new(id.clone(), options, cmd_rx, snapshot_tx);
        tokio::spawn(driver.run());
        Self {
            id,
            cmd_tx,
            snapshot_rx,
        }
    }

    pub fn id(&self) -> &FieldId {
        &self.id
    }

    /// Record a local edit. Restarts the debounce timer, or lands in the
    /// coalescing slot when a commit is already in flight.
    pub fn set_value(&self, value: V) {
        let _ = self.cmd_tx.send(Command::Set(value));
    }

    /// Re-attempt the failed value. No-op unless the session is in
    /// `Error`.
    pub fn retry(&self) {
        let _ = self.cmd_tx.send(Command::Retry);
    }

    /// Discard local edits: cancel any pending commit, restore the
    /// committed value, clear the error.
    pub fn reset(&self) {
        let _ = self.cmd_tx.send(Command::Reset);
    }

    /// Adopt an upstream source-of-truth change. Ignored unless the
    /// session is settled (no local edit pending or in flight).
    pub fn refresh(&self, value: V) {
        let _ = self.cmd_tx.send(Command::Refresh(value));
    }

    /// Current snapshot for rendering.
    pub fn snapshot(&self) -> FieldSnapshot<V> {
        self.snapshot_rx.borrow().clone()
    }

    pub fn value(&self) -> V {
        self.snapshot_rx.borrow().value.clone()
    }

    pub fn status(&self) -> Status {
        self.snapshot_rx.borrow().status
    }

    pub fn last_error(&self) -> Option<Arc<Error>> {
        self.snapshot_rx.borrow().error.clone()
    }

    /// Subscribe to snapshot changes.
    pub fn watch(&self) -> watch::Receiver<FieldSnapshot<V>> {
        self.snapshot_rx.clone()
    }
}

impl<V> Clone for FieldHandle<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            cmd_tx: self.cmd_tx.clone(),
            snapshot_rx: self.snapshot_rx.clone(),
        }
    }
}

impl<V> std::fmt::Debug for FieldHandle<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldHandle").field("id", &self.id).finish()
    }
}
