//! Pure session state machine.
//!
//! All mutation goes through [`SessionState::apply`], which maps one
//! input to the next status plus a list of effects for the driver to
//! carry out. No timers or futures live here; transitions are
//! unit-testable without a runtime.
//!
//! Invariants enforced by the transition function:
//! - at most one commit cycle is active (`in_flight`);
//! - the coalescing slot is non-empty only while a cycle is active, and
//!   is drained as soon as the cycle resolves;
//! - the committed value changes only on a successful commit and is the
//!   rollback target for every failure.

use std::sync::Arc;

use crate::error::Error;
use crate::model::{FieldSnapshot, Status};

/// An external stimulus applied to the session.
#[derive(Debug)]
pub enum Input<V> {
    /// Local edit from the UI.
    Edit(V),
    /// The debounce timer elapsed.
    DebounceFired,
    /// The active commit cycle succeeded. Carries the committed value.
    CommitOk(V),
    /// The active commit cycle failed (validation, handler error, or
    /// timeout).
    CommitFailed(Arc<Error>),
    /// Explicit retry from the error state.
    Retry,
    /// Discard local edits and return to the committed value.
    Reset,
    /// Upstream source-of-truth changed while the session was settled.
    Refresh(V),
    /// The saved-decay timer elapsed.
    DecayElapsed,
}

/// An action the driver must take after a transition.
///
/// Timer release is implicit: the debounce deadline only lives while the
/// status is `Pending` and the decay deadline only while `Saved`; the
/// driver disarms them on any transition away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect<V> {
    /// (Re)arm the debounce timer.
    ArmDebounce,
    /// Begin a commit cycle for this value.
    StartCommit(V),
    /// Arm the saved-decay timer.
    ArmDecay,
    /// Any outcome from a still-outstanding commit no longer applies.
    Supersede,
}

/// Single-owner state for one field session.
#[derive(Debug)]
pub struct SessionState<V> {
    /// The value currently displayed/edited.
    current: V,
    /// The last value known to be durably committed; rollback target.
    original: V,
    status: Status,
    last_error: Option<Arc<Error>>,
    /// A commit cycle is active.
    in_flight: bool,
    /// Coalescing slot: the value to commit next, overwritten by later
    /// edits while a cycle is active.
    queued: Option<V>,
    /// The displayed value at the moment the last commit failed; what
    /// `retry` replays.
    rejected: Option<V>,
    optimistic: bool,
}

impl<V: Clone + PartialEq> SessionState<V> {
    pub fn new(initial: V, optimistic: bool) -> Self {
        Self {
            current: initial.clone(),
            original: initial,
            status: Status::Idle,
            last_error: None,
            in_flight: false,
            queued: None,
            rejected: None,
            optimistic,
        }
    }

    pub fn current(&self) -> &V {
        &self.current
    }

    pub fn original(&self) -> &V {
        &self.original
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn last_error(&self) -> Option<&Arc<Error>> {
        self.last_error.as_ref()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn queued(&self) -> Option<&V> {
        self.queued.as_ref()
    }

    pub fn snapshot(&self) -> FieldSnapshot<V> {
        FieldSnapshot {
            value: self.current.clone(),
            status: self.status,
            error: self.last_error.clone(),
        }
    }

    /// Apply one input and return the effects the driver must carry out.
    pub fn apply(&mut self, input: Input<V>) -> Vec<Effect<V>> {
        match input {
            Input::Edit(v) => self.edit(v),
            Input::DebounceFired => self.debounce_fired(),
            Input::CommitOk(v) => self.commit_ok(v),
            Input::CommitFailed(e) => self.commit_failed(e),
            Input::Retry => self.retry(),
            Input::Reset => self.reset(),
            Input::Refresh(v) => self.refresh(v),
            Input::DecayElapsed => self.decay(),
        }
    }

    fn edit(&mut self, v: V) -> Vec<Effect<V>> {
        self.current = v.clone();
        if self.in_flight {
            // Coalescing slot, last write wins. The cycle in flight keeps
            // going; the slot drains when it resolves.
            self.queued = Some(v);
            return Vec::new();
        }
        // An edit supersedes a failed value; the error itself is kept
        // until a commit succeeds.
        self.rejected = None;
        self.set_status(Status::Pending);
        vec![Effect::ArmDebounce]
    }

    fn debounce_fired(&mut self) -> Vec<Effect<V>> {
        if self.status != Status::Pending || self.in_flight {
            return Vec::new();
        }
        self.begin_commit(self.current.clone())
    }

    fn begin_commit(&mut self, v: V) -> Vec<Effect<V>> {
        self.in_flight = true;
        self.set_status(Status::Saving);
        vec![Effect::StartCommit(v)]
    }

    fn commit_ok(&mut self, committed: V) -> Vec<Effect<V>> {
        if !self.in_flight {
            return Vec::new();
        }
        self.in_flight = false;
        self.original = committed;
        self.last_error = None;
        self.rejected = None;
        if let Some(next) = self.queued.take() {
            // Drain the slot immediately: the debounce delay batches edits
            // ahead of the first round-trip only.
            self.begin_commit(next)
        } else {
            self.set_status(Status::Saved);
            vec![Effect::ArmDecay]
        }
    }

    fn commit_failed(&mut self, error: Arc<Error>) -> Vec<Effect<V>> {
        if !self.in_flight {
            return Vec::new();
        }
        self.in_flight = false;
        // A failed commit does not auto-retry a queued newer value.
        self.queued = None;
        self.rejected = Some(self.current.clone());
        if self.optimistic || matches!(*error, Error::Validation(_)) {
            self.current = self.original.clone();
        }
        self.last_error = Some(error);
        self.set_status(Status::Error);
        Vec::new()
    }

    fn retry(&mut self) -> Vec<Effect<V>> {
        if self.status != Status::Error {
            return Vec::new();
        }
        let Some(v) = self.rejected.clone() else {
            return Vec::new();
        };
        self.current = v.clone();
        self.begin_commit(v)
    }

    fn reset(&mut self) -> Vec<Effect<V>> {
        let superseded = self.in_flight;
        self.in_flight = false;
        self.queued = None;
        self.rejected = None;
        self.current = self.original.clone();
        self.last_error = None;
        self.set_status(Status::Idle);
        if superseded {
            vec![Effect::Supersede]
        } else {
            Vec::new()
        }
    }

    fn refresh(&mut self, v: V) -> Vec<Effect<V>> {
        // Never overwrite an edit that is pending, in flight, or waiting
        // on a retry decision.
        if !self.status.is_settled() || v == self.original {
            return Vec::new();
        }
        self.current = v.clone();
        self.original = v;
        self.set_status(Status::Idle);
        Vec::new()
    }

    fn decay(&mut self) -> Vec<Effect<V>> {
        if self.status == Status::Saved {
            self.set_status(Status::Idle);
        }
        Vec::new()
    }

    fn set_status(&mut self, to: Status) {
        if self.status == to {
            return;
        }
        debug_assert!(
            self.status.can_transition_to(to),
            "illegal status transition: {} -> {to}",
            self.status,
        );
        self.status = to;
    }
}
